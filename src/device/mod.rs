//! Device
//!
//! The flows that run on the cashier's device: login with password or
//! biometrics, the preferences kept between sessions and logout.
pub mod biometric;
pub mod bootstrap;
pub mod storage;

pub use biometric::{BiometricGate, CommandBiometrics, HeadlessBiometrics};
pub use bootstrap::{Bootstrapper, Destination, Enrollment, Outcome};
pub use storage::{CredentialStore, FilePreferences};
