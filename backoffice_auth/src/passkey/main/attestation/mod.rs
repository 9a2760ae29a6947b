mod core;
mod none;
mod packed;
mod utils;

pub(super) use core::verify_attestation;
