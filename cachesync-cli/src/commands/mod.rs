pub mod init;
pub mod regions;
pub mod sync;
