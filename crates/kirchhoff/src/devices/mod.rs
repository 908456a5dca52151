mod capacitor;
mod current_source;
mod fabs_battery;
mod ground;
mod resistance;
mod voltage_source;

pub use capacitor::Capacitor;
pub use current_source::CurrentSource;
pub use fabs_battery::FabsBattery;
pub use ground::Ground;
pub use resistance::Resistance;
pub use voltage_source::VoltageSource;
