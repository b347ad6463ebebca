pub mod current_user;
pub mod health;
pub mod lookup;
pub mod watchlists;
