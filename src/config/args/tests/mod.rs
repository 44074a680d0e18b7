mod parse_credentials;
mod parse_storage;
