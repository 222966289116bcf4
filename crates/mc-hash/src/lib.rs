pub mod digest;
pub mod target;

pub use digest::{sha256, sha256_hex, DIGEST_HEX_LEN};
pub use target::meets_difficulty;
