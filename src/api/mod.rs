use actix_web::HttpResponse;
use serde::Serialize;
use serde_json::json;

pub mod attendance;
pub mod employee;

/// `{ "success": true, "data": ... }` with 200.
pub fn ok<T: Serialize>(data: T) -> HttpResponse {
    HttpResponse::Ok().json(json!({ "success": true, "data": data }))
}

/// Same envelope with 201.
pub fn created<T: Serialize>(data: T) -> HttpResponse {
    HttpResponse::Created().json(json!({ "success": true, "data": data }))
}

#[cfg(test)]
pub mod testing {
    use std::net::SocketAddr;

    use actix_web::test::TestRequest;
    use actix_web::web::{self, Data};

    use crate::config::Config;
    use crate::routes;
    use crate::state::AppState;

    /// Registers state, config and every route, the way `main` does.
    pub fn mount(state: AppState, config: Config) -> impl FnOnce(&mut web::ServiceConfig) {
        move |cfg| {
            cfg.app_data(Data::new(state)).app_data(Data::new(config.clone()));
            routes::configure(cfg, &config);
        }
    }

    /// Rate limiters key on the peer address, so test requests need one.
    pub fn request() -> TestRequest {
        let peer: SocketAddr = "127.0.0.1:40000".parse().unwrap();
        TestRequest::default().peer_addr(peer)
    }
}
