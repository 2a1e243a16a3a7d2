//! Socket descriptors: creation, options, connect and blocking-capable I/O.

mod raw;
mod options;
pub(crate) mod pending;
pub(crate) mod io;

pub use self::raw::{build_socket, fork_lock};
pub use self::options::{set_cloexec, set_keepalive, set_nonblocking, set_send_timeout, set_tcp_nodelay};

/*
 ---
  What each transport asks for:
  ┌──────┬─────────┬─────────────┬──────────────┐
  │ Kind │ Family  │ Type        │ Protocol     │
  ├──────┼─────────┼─────────────┼──────────────┤
  │ TCP  │ v4 / v6 │ SOCK_STREAM │ IPPROTO_TCP  │
  ├──────┼─────────┼─────────────┼──────────────┤
  │ UDP  │ v4 / v6 │ SOCK_DGRAM  │ IPPROTO_UDP  │
  ├──────┼─────────┼─────────────┼──────────────┤
  │ Unix │ AF_UNIX │ SOCK_STREAM │ 0            │
  └──────┴─────────┴─────────────┴──────────────┘
  ---
*/
