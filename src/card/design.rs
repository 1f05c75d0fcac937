//! Built-in card designs, authored as SVG with Maud.
//!
//! Both faces are laid out in a fixed 320x200 logical coordinate space; the
//! rasterizer scales that onto the configured canvas. Interpolated values go
//! through Maud's escaping, so names like `A & B <C>` cannot break the markup.
//!
//! ```text
//! Front                                   Back
//! ┌───────────────────────────────────┐   ┌───────────────────────────────────┐
//! │ [T] TOMO ACADEMY              [ID]│   │ [T] TOMO ACADEMY          [MEMBER]│
//! │     EDUCATION ELEVATED            │   │                            2025   │
//! │ ┌──────┐ Jane Doe           ┌───┐ │   │             ┌──────┐              │
//! │ │ photo│ Designer           │QR │ │   │             │  QR  │              │
//! │ │  or  │ [E001     ]        └───┘ │   │             └──────┘              │
//! │ │  JD  │ [Tokyo    ]  Scan Profile│   │       [SCAN TO VIEW PROFILE]      │
//! │ └──────┘                          │   │ [website        ] [email        ] │
//! │                                   │   │ ─────── OFFICIAL MEMBER CARD ──── │
//! └───────────────────────────────────┘   └───────────────────────────────────┘
//! ```

use super::face::Side;
use super::qr::QrModules;
use maud::{Markup, html};

const FONT: &str = "DejaVu Sans, Liberation Sans, Arial, Helvetica, sans-serif";
const MONO: &str = "DejaVu Sans Mono, Liberation Mono, Courier New, monospace";

/// Longest name/role shown before truncating with an ellipsis.
const MAX_NAME_CHARS: usize = 22;
const MAX_ROLE_CHARS: usize = 32;
const MAX_PILL_CHARS: usize = 18;
const MAX_CONTACT_CHARS: usize = 34;

/// Everything a face shows, resolved from the record and organization.
#[derive(Debug, Clone)]
pub struct CardFields {
    pub name: String,
    pub role: String,
    pub employee_id: String,
    pub location: String,
    pub initials: String,
    pub profile_url: String,
    pub organization: String,
    pub tagline: String,
    pub website: String,
    pub email: String,
    pub member_year: u16,
    /// Photo as a `data:` URI, already embedded by value.
    pub photo: Option<String>,
    pub qr: QrModules,
}

/// Render the built-in design for `side` as SVG text.
pub fn render(side: Side, fields: &CardFields) -> String {
    let body = match side {
        Side::Front => front(fields),
        Side::Back => back(fields),
    };
    shell(body).into_string()
}

/// Truncate to `max` characters, ending in `…` when shortened.
fn clip_text(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let kept: String = text.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", kept.trim_end())
    }
}

fn monogram(organization: &str) -> String {
    organization
        .chars()
        .find(|c| c.is_alphanumeric())
        .map(|c| c.to_uppercase().collect())
        .unwrap_or_default()
}

/// QR modules scaled into a `size`-unit square at `(x, y)`.
fn qr_block(qr: &QrModules, x: f32, y: f32, size: f32) -> Markup {
    let scale = size / qr.size.max(1) as f32;
    html! {
        g transform=(format!("translate({x} {y}) scale({scale})")) shape-rendering="crispEdges" {
            path d=(qr.path) fill="#000000" {}
        }
    }
}

fn shell(body: Markup) -> Markup {
    html! {
        svg xmlns="http://www.w3.org/2000/svg" width="320" height="200" viewBox="0 0 320 200" font-family=(FONT) {
            defs {
                linearGradient id="card-bg" x1="0" y1="0" x2="1" y2="1" {
                    stop offset="0" stop-color="#ffffff" {}
                    stop offset="0.5" stop-color="#fce7f3" {}
                    stop offset="1" stop-color="#f3e8ff" {}
                }
                linearGradient id="brand" x1="0" y1="0" x2="1" y2="0" {
                    stop offset="0" stop-color="#db2777" {}
                    stop offset="0.5" stop-color="#ec4899" {}
                    stop offset="1" stop-color="#db2777" {}
                }
                linearGradient id="accent" x1="0" y1="0" x2="1" y2="1" {
                    stop offset="0" stop-color="#ec4899" {}
                    stop offset="1" stop-color="#a855f7" {}
                }
                clipPath id="card-clip" {
                    rect x="0" y="0" width="320" height="200" rx="8" {}
                }
                clipPath id="photo-clip" {
                    rect x="10" y="56" width="80" height="80" rx="12" {}
                }
            }
            g clip-path="url(#card-clip)" {
                rect x="0" y="0" width="320" height="200" fill="url(#card-bg)" {}
                (body)
            }
            rect x="1" y="1" width="318" height="198" rx="8" fill="none" stroke="#fbcfe8" stroke-width="2" {}
        }
    }
}

fn front(fields: &CardFields) -> Markup {
    html! {
        // Header band
        rect x="0" y="0" width="320" height="40" fill="url(#brand)" {}
        rect x="10" y="8" width="24" height="24" rx="8" fill="#ffffff" {}
        text x="22" y="25" font-size="13" font-weight="bold" fill="#db2777" text-anchor="middle" {
            (monogram(&fields.organization))
        }
        text x="40" y="19" font-size="10" font-weight="bold" fill="#ffffff" letter-spacing="0.5" {
            (fields.organization.to_uppercase())
        }
        text x="40" y="30" font-size="8" fill="#ffffff" fill-opacity="0.9" {
            (fields.tagline)
        }
        rect x="280" y="12" width="30" height="16" rx="4" fill="#ffffff" fill-opacity="0.2" {}
        text x="295" y="23" font-size="8" font-weight="bold" fill="#ffffff" text-anchor="middle" { "ID" }

        // Avatar
        @if let Some(photo) = &fields.photo {
            rect x="10" y="56" width="80" height="80" rx="12" fill="#fce7f3" {}
            image href=(photo) x="10" y="56" width="80" height="80"
                preserveAspectRatio="xMidYMid slice" clip-path="url(#photo-clip)" {}
        } @else {
            rect x="10" y="56" width="80" height="80" rx="12" fill="url(#accent)" {}
            text x="50" y="103" font-size="20" font-weight="bold" fill="#ffffff" text-anchor="middle" {
                (fields.initials)
            }
        }
        rect x="10" y="56" width="80" height="80" rx="12" fill="none" stroke="#fbcfe8" stroke-width="2" {}

        // Identity
        text x="100" y="66" font-size="16" font-weight="900" fill="#db2777" {
            (clip_text(&fields.name, MAX_NAME_CHARS))
        }
        text x="100" y="80" font-size="10" font-weight="bold" fill="#334155" {
            (clip_text(&fields.role, MAX_ROLE_CHARS))
        }
        rect x="100" y="92" width="120" height="15" rx="6" fill="#fce7f3" stroke="#fbcfe8" {}
        text x="106" y="102.5" font-size="9" font-weight="bold" font-family=(MONO) fill="#831843" {
            (clip_text(&fields.employee_id, MAX_PILL_CHARS))
        }
        rect x="100" y="111" width="120" height="15" rx="6" fill="#f3e8ff" stroke="#e9d5ff" {}
        text x="106" y="121.5" font-size="9" font-weight="600" fill="#581c87" {
            (clip_text(&fields.location, MAX_PILL_CHARS))
        }

        // Profile code
        rect x="234" y="84" width="52" height="52" rx="6" fill="#ffffff" stroke="#fbcfe8" stroke-width="2" {}
        (qr_block(&fields.qr, 238.0, 88.0, 44.0))
        text x="260" y="150" font-size="8" font-weight="bold" fill="#db2777" text-anchor="middle" {
            "Scan Profile"
        }
    }
}

fn back(fields: &CardFields) -> Markup {
    html! {
        // Header
        rect x="10" y="10" width="24" height="24" rx="8" fill="url(#card-bg)" stroke="#fbcfe8" {}
        text x="22" y="27" font-size="13" font-weight="bold" fill="#db2777" text-anchor="middle" {
            (monogram(&fields.organization))
        }
        text x="40" y="21" font-size="9" font-weight="900" fill="#db2777" letter-spacing="0.5" {
            (fields.organization.to_uppercase())
        }
        text x="40" y="30" font-size="6" font-weight="600" fill="#64748b" {
            (fields.tagline)
        }
        rect x="262" y="10" width="48" height="22" rx="6" fill="url(#accent)" {}
        text x="286" y="20" font-size="7" font-weight="bold" fill="#ffffff" text-anchor="middle" { "MEMBER" }
        text x="286" y="28" font-size="6" fill="#ffffff" fill-opacity="0.9" text-anchor="middle" {
            (fields.member_year)
        }

        // Profile code
        rect x="130" y="38" width="60" height="60" rx="8" fill="#ffffff" stroke="#fbcfe8" stroke-width="2" {}
        (qr_block(&fields.qr, 136.0, 44.0, 48.0))
        rect x="100" y="106" width="120" height="14" rx="7" fill="#fce7f3" stroke="#fbcfe8" {}
        text x="160" y="115.5" font-size="7" font-weight="bold" fill="#db2777" text-anchor="middle" {
            "SCAN TO VIEW PROFILE"
        }

        // Contact
        rect x="10" y="130" width="146" height="13" rx="6" fill="#fce7f3" stroke="#fbcfe8" {}
        text x="18" y="139" font-size="6" font-weight="bold" fill="#831843" {
            (clip_text(&fields.website, MAX_CONTACT_CHARS))
        }
        rect x="164" y="130" width="146" height="13" rx="6" fill="#f3e8ff" stroke="#e9d5ff" {}
        text x="172" y="139" font-size="6" font-weight="bold" fill="#581c87" {
            (clip_text(&fields.email, MAX_CONTACT_CHARS))
        }

        // Footer
        line x1="10" y1="160" x2="310" y2="160" stroke="#fbcfe8" {}
        text x="160" y="173" font-size="7" font-weight="bold" fill="#db2777" text-anchor="middle" {
            "OFFICIAL MEMBER CARD"
        }
        text x="160" y="183" font-size="5" fill="#64748b" text-anchor="middle" {
            "Valid " (fields.member_year) " \u{2022} Unauthorized use prohibited"
        }
    }
}
