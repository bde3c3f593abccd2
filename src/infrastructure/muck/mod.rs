pub mod http_muck;
