use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};

use super::API_PREFIX;

fn base_join(base: &str, path: &str) -> String {
    let b = base.trim_end_matches('/');
    let p = path.trim_start_matches('/');
    format!("{}/{}", b, p)
}

fn enc(s: &str) -> String {
    utf8_percent_encode(s, NON_ALPHANUMERIC).to_string()
}

pub fn alarms(base: &str) -> String {
    base_join(base, &format!("{}/alarms/", API_PREFIX))
}
pub fn alarm(base: &str, id: i64) -> String {
    base_join(base, &format!("{}/alarms/{}", API_PREFIX, id))
}
pub fn stopwatch(base: &str) -> String {
    base_join(base, &format!("{}/stopwatch/", API_PREFIX))
}
pub fn stopwatch_start(base: &str) -> String {
    base_join(base, &format!("{}/stopwatch/start", API_PREFIX))
}
pub fn stopwatch_stop(base: &str) -> String {
    base_join(base, &format!("{}/stopwatch/stop", API_PREFIX))
}
pub fn stopwatch_reset(base: &str) -> String {
    base_join(base, &format!("{}/stopwatch/reset", API_PREFIX))
}
pub fn timer(base: &str) -> String {
    base_join(base, &format!("{}/timer/", API_PREFIX))
}
pub fn timer_start(base: &str) -> String {
    base_join(base, &format!("{}/timer/start", API_PREFIX))
}
pub fn timer_stop(base: &str) -> String {
    base_join(base, &format!("{}/timer/stop", API_PREFIX))
}
pub fn timer_reset(base: &str) -> String {
    base_join(base, &format!("{}/timer/reset", API_PREFIX))
}
pub fn world_clock(base: &str) -> String {
    base_join(base, &format!("{}/worldclock/", API_PREFIX))
}
pub fn world_cities(base: &str) -> String {
    base_join(base, &format!("{}/worldclock/cities", API_PREFIX))
}
pub fn world_city(base: &str, city: &str) -> String {
    base_join(base, &format!("{}/worldclock/{}", API_PREFIX, enc(city)))
}
pub fn env_clock(base: &str, city: &str) -> String {
    base_join(base, &format!("{}/envclock/{}", API_PREFIX, enc(city)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_without_double_slash() {
        assert_eq!(alarms("http://h:5000/"), "http://h:5000/api/alarms/");
        assert_eq!(alarm("http://h:5000", 42), "http://h:5000/api/alarms/42");
        assert_eq!(timer_start("http://h"), "http://h/api/timer/start");
    }

    #[test]
    fn city_segments_are_encoded() {
        assert_eq!(
            world_city("http://h", "Buenos Aires"),
            "http://h/api/worldclock/Buenos%20Aires"
        );
        assert_eq!(env_clock("http://h", "São Paulo"), "http://h/api/envclock/S%C3%A3o%20Paulo");
    }
}
