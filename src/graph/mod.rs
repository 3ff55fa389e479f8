//! Microsoft Graph drive access.

pub mod drive;
pub mod http;
pub mod types;

pub use drive::{join_drive_path, DriveClient, UploadMethod};
pub use types::{DriveInfo, DriveItem, FileFacet, FileHashes, FolderFacet};
