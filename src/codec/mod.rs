pub mod gearbox;
pub mod lane;
pub mod word;

pub use gearbox::{bytes_to_words, words_to_bytes, Gearbox};
pub use lane::{pack, pack_lanes, unpack};
pub use word::{decode, encode};
