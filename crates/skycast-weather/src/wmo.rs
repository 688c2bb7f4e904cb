//! WMO weather interpretation codes.
//! See: https://open-meteo.com/en/docs#weathervariables

use skycast_core::ForecastSlot;

/// Precipitation chances below this percentage are left out of the line.
pub const PRECIP_THRESHOLD: i64 = 10;

/// Rendered when the forecast has no record for a requested hour.
pub const NO_DATA: &str = "нет данных";

/// Description for codes missing from the table.
pub const GENERIC_DESCRIPTION: &str = "Погода";

const SNOW_CODES: [i32; 3] = [71, 73, 75];
const RAIN_CODES: [i32; 4] = [61, 63, 65, 80];

pub fn description(code: i32) -> &'static str {
    match code {
        0 => "Ясно",
        1 => "Преимущественно ясно",
        2 => "Переменная облачность",
        3 => "Пасмурно",
        45 | 48 => "Туман",
        51 => "Морось",
        61 | 63 => "Дождь",
        65 => "Сильный дождь",
        71 | 73 => "Снег",
        75 => "Сильный снег",
        80 => "Ливень",
        95 => "Гроза",
        _ => GENERIC_DESCRIPTION,
    }
}

pub fn emoji(code: i32) -> &'static str {
    match code {
        0 => "☀️",
        1 | 2 => "⛅",
        3 => "☁️",
        45 | 48 => "🌫",
        51 => "🌦",
        61 | 63 | 65 | 80 => "🌧",
        71 | 73 | 75 => "❄️",
        95 => "⛈",
        _ => "🌡",
    }
}

/// "снег (40%)", "дождь (40%)", "осадки (40%)", or `None` under the threshold.
pub fn precipitation_label(code: i32, probability: Option<f64>) -> Option<String> {
    let pct = probability?.round() as i64;
    if pct < PRECIP_THRESHOLD {
        return None;
    }
    let kind = if SNOW_CODES.contains(&code) {
        "снег"
    } else if RAIN_CODES.contains(&code) {
        "дождь"
    } else {
        "осадки"
    };
    Some(format!("{kind} ({pct}%)"))
}

/// One report line for a slot: "☀️ 12°C, Ясно" or "🌧 8°C, Дождь, дождь (70%)".
pub fn render_slot(slot: &ForecastSlot) -> String {
    let code = slot.weather_code;
    let precip = precipitation_label(code, slot.precipitation_probability)
        .map(|p| format!(", {p}"))
        .unwrap_or_default();
    format!(
        "{} {:.0}°C, {}{}",
        emoji(code),
        slot.temperature,
        description(code),
        precip
    )
}
