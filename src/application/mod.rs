//! Application layer driving provisioning attempts.
//!
//! This module defines the `Provisioner`, which owns the external ports and
//! carries out the side effects the provisioning pipeline asks for, feeding
//! each remote completion back into it until the attempt ends.

pub mod provisioner;
