pub mod audit;
pub mod desks;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod tickets;
pub mod ws;

pub use response::{ApiError, ApiResponse, ApiResult, DeskResponse, TicketResponse};
pub use routes::create_router;
