//! MERRA-2 `tavg1_2d_slv_Nx` variable names and the fields derived from them.

/// Northward wind at 10 m (m/s).
pub const V10M: &str = "V10M";
/// Eastward wind at 10 m (m/s).
pub const U10M: &str = "U10M";
/// Northward wind at 50 m (m/s).
pub const V50M: &str = "V50M";
/// Eastward wind at 50 m (m/s).
pub const U50M: &str = "U50M";
/// Surface pressure (Pa).
pub const PS: &str = "PS";
/// Temperature at 2 m (K).
pub const T2M: &str = "T2M";
/// Temperature at 10 m (K).
pub const T10M: &str = "T10M";
/// Specific humidity at 2 m (kg/kg).
pub const QV2M: &str = "QV2M";
/// Specific humidity at 10 m (kg/kg).
pub const QV10M: &str = "QV10M";
/// Zero-plane displacement height (m).
pub const DISPH: &str = "DISPH";

/// Wind speed magnitude at 10 m.
pub const WS10M: &str = "WS10M";
/// Wind speed magnitude at 50 m.
pub const WS50M: &str = "WS50M";
/// Relative humidity at 2 m, as a fraction.
pub const RH2M: &str = "RH2M";
/// Relative humidity at 10 m, as a fraction.
pub const RH10M: &str = "RH10M";

/// The variables every input grid is expected to carry.
pub const INPUT_FIELDS: [&str; 10] = [V10M, U10M, V50M, U50M, PS, T2M, T10M, QV2M, QV10M, DISPH];
