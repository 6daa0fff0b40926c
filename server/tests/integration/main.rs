//! Integration tests for aio-server
//!
//! These run real `/bin/sh` artifacts through the filesystem store and the
//! process runner, and drive the HTTP router end to end. They are slower
//! than the unit suite and need a Unix host.

#![cfg(unix)]

mod json_rpc;
