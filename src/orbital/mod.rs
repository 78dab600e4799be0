pub mod anomaly;
pub mod elements;
pub mod nodes;

pub use anomaly::{
    eccentric_anomaly_from_true, mean_anomaly_from_eccentric, signed_degrees, time_from_mean,
    time_to_mean_anomaly, time_to_true_anomaly, translate_anomaly, wrap_degrees,
};
pub use elements::{plane_normal, OrbitState};
pub use nodes::{
    descending_node, find_relative_node, lat_lon_of_vector, relative_plane_angle,
    time_to_reference_an, time_to_reference_dn, time_to_relative_an, time_to_relative_dn,
};
