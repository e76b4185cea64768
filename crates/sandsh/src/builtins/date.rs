//! date builtin.
//!
//! Formats the shell's injected clock, so output is deterministic under
//! test. Supports `+FORMAT` with %Y %m %d %H %M %S %s %j %u and literal
//! text; the default format is `%Y-%m-%d %H:%M:%S`.

use async_trait::async_trait;

use super::{Builtin, Context};
use crate::error::Result;
use crate::interpreter::ExecResult;

pub struct Date;

#[async_trait]
impl Builtin for Date {
    async fn execute(&self, ctx: &mut Context<'_>) -> Result<ExecResult> {
        let epoch = ctx.state.now_epoch();
        let format = match ctx.args.first() {
            Some(arg) if arg.starts_with('+') => &arg[1..],
            Some(arg) => {
                return Ok(ExecResult::err(format!("date: invalid date '{arg}'\n"), 1))
            }
            None => "%Y-%m-%d %H:%M:%S",
        };
        Ok(ExecResult::ok(format!("{}\n", render(format, epoch))))
    }

    fn usage(&self) -> &'static str {
        "usage: date [+format]"
    }
}

fn render(format: &str, epoch: u64) -> String {
    let civil = CivilTime::from_epoch(epoch);
    let mut out = String::new();
    let mut chars = format.chars();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('Y') => out.push_str(&civil.year.to_string()),
            Some('m') => out.push_str(&format!("{:02}", civil.month)),
            Some('d') => out.push_str(&format!("{:02}", civil.day)),
            Some('H') => out.push_str(&format!("{:02}", civil.hour)),
            Some('M') => out.push_str(&format!("{:02}", civil.minute)),
            Some('S') => out.push_str(&format!("{:02}", civil.second)),
            Some('s') => out.push_str(&epoch.to_string()),
            Some('j') => out.push_str(&format!("{:03}", civil.day_of_year)),
            Some('u') => out.push_str(&civil.weekday.to_string()),
            Some('%') => out.push('%'),
            Some(other) => {
                out.push('%');
                out.push(other);
            }
            None => out.push('%'),
        }
    }
    out
}

struct CivilTime {
    year: i64,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
    second: u32,
    day_of_year: u32,
    /// ISO weekday, 1 = Monday.
    weekday: u32,
}

impl CivilTime {
    /// Days-from-epoch to civil date, via the classic era decomposition.
    fn from_epoch(epoch: u64) -> Self {
        let days = (epoch / 86_400) as i64;
        let secs = epoch % 86_400;

        let z = days + 719_468;
        let era = z.div_euclid(146_097);
        let doe = z.rem_euclid(146_097);
        let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
        let year = yoe + era * 400;
        let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
        let mp = (5 * doy + 2) / 153;
        let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
        let month = if mp < 10 { mp + 3 } else { mp - 9 } as u32;
        let year = if month <= 2 { year + 1 } else { year };

        let jan1 = {
            let y = year - 1;
            365 * y + y / 4 - y / 100 + y / 400
        };
        let today = days + 719_162;
        let day_of_year = (today - jan1 + 1) as u32;
        let weekday = ((days + 3).rem_euclid(7) + 1) as u32;

        Self {
            year,
            month,
            day,
            hour: (secs / 3600) as u32,
            minute: (secs % 3600 / 60) as u32,
            second: (secs % 60) as u32,
            day_of_year,
            weekday,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_zero_is_1970() {
        let t = CivilTime::from_epoch(0);
        assert_eq!((t.year, t.month, t.day), (1970, 1, 1));
        assert_eq!((t.hour, t.minute, t.second), (0, 0, 0));
        assert_eq!(t.weekday, 4); // Thursday
    }

    #[test]
    fn known_timestamp() {
        // 2024-02-29T12:30:45Z
        let t = CivilTime::from_epoch(1_709_209_845);
        assert_eq!((t.year, t.month, t.day), (2024, 2, 29));
        assert_eq!((t.hour, t.minute, t.second), (12, 30, 45));
    }

    #[test]
    fn formats() {
        assert_eq!(render("%Y-%m-%d", 0), "1970-01-01");
        assert_eq!(render("%s", 42), "42");
        assert_eq!(render("100%%", 0), "100%");
    }
}
