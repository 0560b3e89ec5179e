//! Helpers for reading `### Section ###` structured model replies.

/// Text of the `### <name> ###` section, up to the next `###` header.
///
/// Header matching ignores case and extra spaces. Returns `None` if the
/// header is absent.
pub fn extract_section(reply: &str, name: &str) -> Option<String> {
    let wanted = name.trim().to_lowercase();
    let mut collecting = false;
    let mut found = false;
    let mut lines = Vec::new();

    for line in reply.lines() {
        if let Some(header) = header_name(line) {
            if collecting {
                break;
            }
            if header == wanted {
                collecting = true;
                found = true;
            }
            continue;
        }
        if collecting {
            lines.push(line);
        }
    }

    found.then(|| lines.join("\n").trim().to_string())
}

fn header_name(line: &str) -> Option<String> {
    let trimmed = line.trim();
    if !trimmed.starts_with("###") {
        return None;
    }
    let inner = trimmed.trim_matches('#').trim();
    if inner.is_empty() {
        return None;
    }
    Some(inner.to_lowercase())
}
