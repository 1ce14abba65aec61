//! # arpcast core
//!
//! The scan → match → report cycle and the two collaborators it talks to:
//!
//! * [`scanner`]: finds devices on a LAN segment ([`scanner::NetworkScanner`]).
//! * [`matcher`]: narrows observations down to configured targets.
//! * [`reporter`]: turns devices into timestamped broker messages.
//! * [`broker`]: the publishing side of the MQTT link ([`broker::Publisher`]).
//! * [`driver`]: ticks the cycle forever.

pub mod broker;
pub mod driver;
pub mod matcher;
pub mod reporter;
pub mod scanner;
pub mod system;
