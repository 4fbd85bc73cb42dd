// ABOUTME: Type-safe identifiers for cloud resources.
// ABOUTME: Uses phantom types to prevent CID confusion at compile time.

mod cid;

pub use cid::{Cid, Disk, DiskCid, Stemcell, StemcellCid, Vm, VmCid};
