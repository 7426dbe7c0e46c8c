// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use email_address::EmailAddress;
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::command::{Command, Transaction};
use crate::dom::inline::StyleAttr;
use crate::dom::position::Range;
use crate::error::EditError;

static URL_LIKE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"https?://[^\s<>"]+"#).expect("valid regex"));
static EMAIL_LIKE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}")
        .expect("valid regex")
});

/// A link target found in text, as a char range of the run and its href.
#[derive(Clone, Debug, PartialEq, Eq)]
struct Found {
    from: usize,
    to: usize,
    href: String,
}

/// Turns bare URLs and e-mail addresses in unlinked, non-code text into
/// links. Returns the number of links created.
pub(crate) fn auto_link(tx: &mut Transaction<'_>) -> Result<usize, EditError> {
    let mut wraps = Vec::new();
    for id in tx.doc().leaves() {
        let Some(content) = tx.doc().get(id).and_then(|b| b.inline()) else {
            continue;
        };
        for (start, run) in content.text_runs() {
            if run.style.link.is_some() || run.style.code {
                continue;
            }
            for found in find_links(&run.text) {
                wraps.push((
                    Range::within(id, start + found.from, start + found.to),
                    found.href,
                ));
            }
        }
    }
    let count = wraps.len();
    for (range, href) in wraps {
        tx.apply(Command::WrapInline {
            range,
            style: StyleAttr::Link(href),
        })?;
    }
    Ok(count)
}

fn find_links(text: &str) -> Vec<Found> {
    let mut out = Vec::new();
    for m in URL_LIKE.find_iter(text) {
        let candidate = m
            .as_str()
            .trim_end_matches(['.', ',', ';', ':', '!', '?', ')', '\'']);
        if Url::parse(candidate).is_ok_and(|u| u.host().is_some()) {
            let from = text[..m.start()].chars().count();
            out.push(Found {
                from,
                to: from + candidate.chars().count(),
                href: candidate.to_owned(),
            });
        }
    }
    for m in EMAIL_LIKE.find_iter(text) {
        let from = text[..m.start()].chars().count();
        let to = from + m.as_str().chars().count();
        let overlaps = out.iter().any(|f| from < f.to && to > f.from);
        if !overlaps && EmailAddress::is_valid(m.as_str()) {
            out.push(Found {
                from,
                to,
                href: format!("mailto:{}", m.as_str()),
            });
        }
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::command::Origin;
    use crate::dom::block::Block;
    use crate::dom::document::Document;
    use crate::dom::to_html::ToHtml;

    #[test]
    fn trailing_punctuation_is_not_part_of_the_url() {
        let found = find_links("see https://example.org/a.");
        assert_eq!(
            found,
            vec![Found {
                from: 4,
                to: 25,
                href: "https://example.org/a".to_owned()
            }]
        );
    }

    #[test]
    fn urls_and_addresses_become_links() {
        let mut doc = Document::from_blocks(vec![
            Block::paragraph("go to https://x.org now"),
            Block::paragraph("mail me@example.com"),
            Block::code_block(None, "https://not.linked"),
        ]);
        let count = {
            let mut tx = Transaction::new(&mut doc, Origin::Autoformat, &[]);
            auto_link(&mut tx).unwrap()
        };
        assert_eq!(count, 2);
        assert_eq!(
            doc.to_html(),
            concat!(
                r#"<p>go to <a href="https://x.org">https://x.org</a> now</p>"#,
                r#"<p>mail <a href="mailto:me@example.com">me@example.com</a></p>"#,
                "<pre><code>https://not.linked</code></pre>"
            )
        );
    }

    #[test]
    fn existing_links_are_left_alone() {
        let mut doc = Document::from_blocks(vec![Block::paragraph("https://x.org")]);
        let leaf = doc.leaves()[0];
        Command::WrapInline {
            range: Range::within(leaf, 0, 13),
            style: StyleAttr::Link("https://y.org".into()),
        }
        .apply_to(&mut doc, Origin::User)
        .unwrap();
        let count = {
            let mut tx = Transaction::new(&mut doc, Origin::Autoformat, &[]);
            auto_link(&mut tx).unwrap()
        };
        assert_eq!(count, 0);
    }
}
