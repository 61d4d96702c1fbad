pub mod figment;
pub mod sensitive;
pub mod validator;

pub use self::sensitive::Sensitive;
