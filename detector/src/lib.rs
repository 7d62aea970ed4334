pub mod archive;
pub mod capture;
pub mod decision;
pub mod dispatcher;
pub mod filter;
pub mod notify;
pub mod reference;
pub mod storage;
pub mod window;
