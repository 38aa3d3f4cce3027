mod api;

pub use api::{
    AuthResponse, BackendHealthResponse, HealthResponse, LoginRequest, MeResponse,
    MessageResponse, Pagination, Product, ProductListQuery, ProductListResponse, ProductResponse,
    RegisterRequest, RouteNotFound, UserView,
};
