pub mod server;

#[derive(Debug)]
pub enum Action {
    Server {
        port: u16,
        backend_url: String,
        login_path: String,
        frontend_url: String,
    },
}
