pub use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};

pub use nix::unistd::Pid;
