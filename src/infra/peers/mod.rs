//! Peer address sources: the configured address book and the live
//! connection table.

pub mod address_book;
pub mod connections;

pub use address_book::{FileAddressBook, ParsedAddressBook, parse_address_book};
pub use connections::{ProcNetConnectionTable, remote_addresses_on_port};
