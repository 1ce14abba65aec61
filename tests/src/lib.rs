//! End-to-end checks of the scan cycle with the network and the broker faked out.

pub mod support;

#[cfg(test)]
mod presence;
