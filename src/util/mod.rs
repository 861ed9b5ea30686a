pub mod b64;
pub mod money_amount;
pub mod scrub;
pub mod shutdown;
pub mod timestamp;

pub use b64::Base64Bytes;
pub use money_amount::FixedPoint18;
pub use shutdown::SigDown;
pub use timestamp::UnixTimestamp;
