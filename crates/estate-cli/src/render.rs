//! Terminal rendering of cards, page controls and the profile header.

use chrono::{DateTime, Local, Utc};
use colored::Colorize;
use estate_application::listing::PageInfo;
use estate_core::identity::Identity;
use estate_core::pagination::PageControl;
use estate_core::property::Property;

/// Card body lines for one listing, without colors.
pub fn card_lines(property: &Property, favorited: bool) -> Vec<String> {
    let marker = if favorited { "♥" } else { "♡" };
    let mut heading = format!("{} [{}] {}", marker, property.id, property.title);
    if property.active {
        heading.push_str(" [Active]");
    }

    let mut lines = vec![
        heading,
        format!("    {}  {}", property.formatted_price(), property.location),
        format!(
            "    {} beds | {} baths | {} sqft",
            property.beds_label(),
            property.baths_label(),
            property.sqft_label()
        ),
    ];
    let mut details = Vec::new();
    if !property.agent.is_empty() {
        details.push(format!("Agent: {}", property.agent));
    }
    if let Some(mls) = property.mls_label() {
        details.push(mls);
    }
    if !details.is_empty() {
        lines.push(format!("    {}", details.join(" | ")));
    }
    lines.push(format!("    Image: {}", property.image_or_placeholder()));
    lines
}

pub fn print_card(property: &Property, favorited: bool, timestamp: Option<(&str, DateTime<Utc>)>) {
    let mut lines = card_lines(property, favorited).into_iter();
    if let Some(heading) = lines.next() {
        println!("{}", heading.bold());
    }
    for line in lines {
        println!("{}", line);
    }
    if let Some((label, at)) = timestamp {
        println!("    {}", format!("{} {}", label, format_timestamp(at)).dimmed());
    }
    println!();
}

pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

/// Page controls as a single line, e.g. `< Prev  1 … 4 [5] 6 … 9  Next >`.
///
/// Disabled controls are wrapped in parentheses.
pub fn page_controls_line(info: &PageInfo) -> String {
    let prev = if info.has_previous { "< Prev" } else { "(< Prev)" };
    let next = if info.has_next { "Next >" } else { "(Next >)" };
    let pages: Vec<String> = info
        .controls
        .iter()
        .map(|control| match control {
            PageControl::Page(page) if *page == info.page => format!("[{}]", page),
            PageControl::Page(page) => page.to_string(),
            PageControl::Ellipsis => "…".to_string(),
        })
        .collect();
    format!("{}  {}  {}", prev, pages.join(" "), next)
}

pub fn print_page_controls(info: &PageInfo) {
    if info.total_pages <= 1 {
        return;
    }
    println!("{}", page_controls_line(info).cyan());
    println!("Page {} of {}", info.page, info.total_pages);
}

/// Header line for the current identity.
pub fn profile_line(identity: &Identity) -> String {
    match identity.profile() {
        None => "Not signed in".to_string(),
        Some(profile) => {
            let mut line = format!("({}) {}", profile.initials, profile.display_name);
            if let Some(email) = &profile.email {
                line.push_str(&format!(" <{}>", email));
            }
            if profile.is_guest {
                line.push_str(" [Guest]");
            }
            line.push_str(&format!(" | {}", profile.sign_out_label()));
            line
        }
    }
}

pub fn print_profile(identity: &Identity) {
    println!("{}", profile_line(identity).bright_blue());
    println!();
}

pub fn print_empty(message: &str) {
    println!("{}", message.yellow());
}
