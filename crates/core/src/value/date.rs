// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Conversion between `YYYY-MM-DD` text and days since 1970-01-01 in the
//! proleptic Gregorian calendar.

pub fn parse_date(text: &str) -> Option<i32> {
	let mut parts = text.trim().splitn(3, '-');
	let year: i64 = parts.next()?.parse().ok()?;
	let month: u32 = parts.next()?.parse().ok()?;
	let day: u32 = parts.next()?.parse().ok()?;

	if !(1..=12).contains(&month) || day == 0 || day > days_in_month(year, month) {
		return None;
	}

	i32::try_from(days_from_civil(year, month, day)).ok()
}

pub fn format_date(days: i32) -> String {
	let (year, month, day) = civil_from_days(days as i64);
	format!("{year:04}-{month:02}-{day:02}")
}

fn is_leap_year(year: i64) -> bool {
	(year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn days_in_month(year: i64, month: u32) -> u32 {
	match month {
		2 if is_leap_year(year) => 29,
		2 => 28,
		4 | 6 | 9 | 11 => 30,
		_ => 31,
	}
}

fn days_from_civil(year: i64, month: u32, day: u32) -> i64 {
	let year = if month <= 2 {
		year - 1
	} else {
		year
	};
	let era = year.div_euclid(400);
	let yoe = year - era * 400;
	let month = month as i64;
	let doy = (153 * (if month > 2 { month - 3 } else { month + 9 }) + 2) / 5 + day as i64 - 1;
	let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
	era * 146097 + doe - 719468
}

fn civil_from_days(days: i64) -> (i64, u32, u32) {
	let z = days + 719468;
	let era = z.div_euclid(146097);
	let doe = z - era * 146097;
	let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
	let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
	let mp = (5 * doy + 2) / 153;
	let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
	let month = if mp < 10 {
		mp + 3
	} else {
		mp - 9
	} as u32;
	let year = yoe + era * 400 + if month <= 2 { 1 } else { 0 };
	(year, month, day)
}
