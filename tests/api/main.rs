mod delivery;
mod health_check;
mod helpers;
mod weather;
