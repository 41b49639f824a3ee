// SmartMark services
// Stateless helpers shared by the backend.

pub mod token_service;
