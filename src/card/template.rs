//! `{placeholder}` substitution for user-supplied SVG face templates.
//!
//! A placeholder is a run of lowercase letters and underscores between
//! braces, e.g. `{name}`. Anything else in braces (CSS blocks in a
//! `<style>` element, for instance) is copied through untouched. Values are
//! XML-escaped, so they are safe in both text nodes and attribute values.
//!
//! | Placeholder | Value |
//! |---|---|
//! | `{name}` | Display name |
//! | `{role}` | Role, may be empty |
//! | `{employee_id}` | Employee id |
//! | `{location}` | Location, `Remote` when absent |
//! | `{initials}` | Up to two initials from the name |
//! | `{profile_url}` | Profile page the QR code points to |
//! | `{organization}` | Organization name |
//! | `{tagline}`, `{website}`, `{email}`, `{member_year}` | Organization branding |
//! | `{photo}` | Photo as a `data:` URI, empty when the record has none |
//! | `{qr}` | QR path data, one unit per module |
//! | `{qr_size}` | QR modules per side |

use super::design::CardFields;
use super::renderer::RenderError;

/// Fill every placeholder in `template` from `fields`.
///
/// An unknown placeholder is an error rather than being left in the output,
/// so a typo in a template fails loudly instead of printing `{nmae}`.
pub fn fill(template: &str, fields: &CardFields) -> Result<String, RenderError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) if is_placeholder(&after[..close]) => {
                let key = &after[..close];
                let value = lookup(key, fields).ok_or_else(|| {
                    RenderError::Template(format!("unknown placeholder {{{key}}}"))
                })?;
                out.push_str(&escape_xml(&value));
                rest = &after[close + 1..];
            }
            _ => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    Ok(out)
}

fn is_placeholder(key: &str) -> bool {
    !key.is_empty() && key.chars().all(|c| c.is_ascii_lowercase() || c == '_')
}

fn lookup(key: &str, fields: &CardFields) -> Option<String> {
    let value = match key {
        "name" => fields.name.clone(),
        "role" => fields.role.clone(),
        "employee_id" => fields.employee_id.clone(),
        "location" => fields.location.clone(),
        "initials" => fields.initials.clone(),
        "profile_url" => fields.profile_url.clone(),
        "organization" => fields.organization.clone(),
        "tagline" => fields.tagline.clone(),
        "website" => fields.website.clone(),
        "email" => fields.email.clone(),
        "member_year" => fields.member_year.to_string(),
        "photo" => fields.photo.clone().unwrap_or_default(),
        "qr" => fields.qr.path.clone(),
        "qr_size" => fields.qr.size.to_string(),
        _ => return None,
    };
    Some(value)
}

fn escape_xml(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}
