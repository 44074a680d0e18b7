pub mod canned_acl;
pub mod regex;
pub mod storage_path;
pub mod transform_command;
pub mod url;
