pub mod doh_server_mock;
