mod city_name;
mod email_address;
mod frequency;
mod weather;

pub use city_name::CityName;
pub use email_address::EmailAddress;
pub use frequency::Frequency;
pub use weather::WeatherSnapshot;
