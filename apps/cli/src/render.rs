//! Plain-text views of the two pages. Everything here reads page state and nothing else.

use std::fmt::Write as _;

use chrono::NaiveDate;
use client_core::{
    calendar::{CalendarPage, FilterChoice, Layout, ListView, Scope},
    issue::IssuePage,
};
use shared::protocol::{Event, Post};

pub const EMPTY_CALENDAR_MESSAGE: &str = "Your calendar is currently empty.";

fn choice_label(choice: &FilterChoice) -> String {
    if choice.selected {
        format!("[{}]", choice.filter.label())
    } else {
        choice.filter.label().to_string()
    }
}

fn toggle_label(label: &str, selected: bool) -> String {
    if selected {
        format!("[{label}]")
    } else {
        label.to_string()
    }
}

fn attendance_label(attending: bool) -> &'static str {
    if attending {
        "Attending"
    } else {
        "Not Attending"
    }
}

pub fn calendar(page: &CalendarPage) -> String {
    let state = page.state();
    let mut out = String::new();

    let choices: Vec<String> = page.filter_choices().iter().map(choice_label).collect();
    let _ = writeln!(out, "Upcoming political events in: {}", choices.join(" | "));
    let _ = writeln!(
        out,
        "{} | {}    {} | {}",
        toggle_label("Personal", state.scope == Scope::Mine),
        toggle_label("Community", state.scope == Scope::Community),
        toggle_label("Calendar", state.layout == Layout::Grid),
        toggle_label("List", state.layout == Layout::List),
    );
    out.push('\n');

    match state.layout {
        Layout::Grid => {
            let months = page.grid_view();
            if months.is_empty() {
                let _ = writeln!(out, "No events to show.");
            }
            for ((year, month), events) in months {
                let heading = NaiveDate::from_ymd_opt(year, month, 1)
                    .map(|first| first.format("%B %Y").to_string())
                    .unwrap_or_else(|| format!("{year}-{month:02}"));
                let _ = writeln!(out, "{heading}");
                for event in events {
                    let day = event
                        .starts_at()
                        .map(|at| at.format("%a %e").to_string())
                        .unwrap_or_default();
                    let _ = writeln!(out, "  {day}  #{} {}", event.id, event.title);
                }
            }
        }
        Layout::List => match page.list_view() {
            ListView::EmptyCalendar => {
                let _ = writeln!(out, "{EMPTY_CALENDAR_MESSAGE}");
            }
            ListView::Events(events) => {
                for event in events {
                    out.push_str(&event_card(event, page.is_attending(event.id)));
                }
            }
        },
    }
    out
}

fn event_card(event: &Event, attending: bool) -> String {
    format!(
        "#{} {}\n  {}\n  {}\n  {}\n\n",
        event.id,
        event.title,
        event.display_date(),
        event.brief_description,
        attendance_label(attending),
    )
}

pub fn event_details(event: &Event, attending: bool) -> String {
    format!(
        "{}\n{}\n\n{}\n\n{}\n{}\n",
        event.title,
        event.display_date(),
        event.full_description,
        event.address_line(),
        attendance_label(attending),
    )
}

fn comment_line(page: &IssuePage, post: &Post) -> String {
    let author = page.author_name(post).unwrap_or("unknown user");
    format!(
        "  #{} {}: {}  (+{} / -{})\n",
        post.id, author, post.content, post.upvotes, post.downvotes
    )
}

pub fn issue(page: &IssuePage) -> String {
    let state = page.state();
    let mut out = String::new();
    let _ = writeln!(out, "{}", state.title);
    let _ = writeln!(out, "Description:\n{}\n", state.description);

    if let Some(message) = page.error_message() {
        let _ = writeln!(out, "! {message}\n");
    }

    let _ = writeln!(out, "For");
    for post in page.for_comments() {
        out.push_str(&comment_line(page, post));
    }
    let _ = writeln!(out, "\nAgainst");
    for post in page.against_comments() {
        out.push_str(&comment_line(page, post));
    }
    out
}
