//! Weather tool with a fixed demonstration payload.

use async_trait::async_trait;

use super::{str_arg, Arguments, ParamType, Tool, ToolParameter};

pub struct Weather;

#[async_trait]
impl Tool for Weather {
    fn name(&self) -> &str {
        "weather"
    }

    fn description(&self) -> &str {
        "Get real-time weather information for any city or location."
    }

    fn parameters(&self) -> Vec<ToolParameter> {
        vec![
            ToolParameter::required(
                "city",
                ParamType::String,
                "City name or location (e.g., 'Tokyo', 'New York', 'London')",
            ),
            ToolParameter::optional(
                "country",
                ParamType::String,
                "Country code (e.g., 'JP', 'US', 'GB') - optional",
            ),
        ]
    }

    async fn execute(&self, args: &Arguments) -> anyhow::Result<String> {
        let city = str_arg(args, "city").unwrap_or_default();
        if city.trim().is_empty() {
            return Ok("Error: city must not be empty".to_string());
        }
        let location = match str_arg(args, "country").filter(|c| !c.is_empty()) {
            Some(country) => format!("{}, {}", city, country),
            None => city,
        };

        Ok(format!(
            "Weather for {}:\n\
             - Temperature: 22°C (feels like 24°C)\n\
             - Conditions: Partly cloudy\n\
             - Humidity: 65%\n\
             - Wind: 12 km/h\n\
             - Pressure: 1013 hPa\n\
             - Visibility: 10 km",
            location
        ))
    }
}
