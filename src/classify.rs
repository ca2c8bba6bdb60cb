//! Publisher classification for discovered links.
//!
//! Every URL the search phase encounters is routed through [`classify`],
//! which maps it to exactly one [`Publisher`]. The mapping is a pure
//! function: a `.pdf`-suffixed URL is always [`Publisher::DirectFile`]
//! regardless of domain, a URL on a known publisher domain gets that
//! publisher's identity, and everything else falls back to
//! [`Publisher::Generic`].

use std::fmt;

use url::Url;

/// Identity of the site a link belongs to, driving resolution strategy,
/// queue file naming, and worker dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Publisher {
    ScienceDirect,
    Mdpi,
    HeinOnline,
    Wiley,
    TandfOnline,
    Springer,
    Brill,
    Ieee,
    ResearchGate,
    Iop,
    GeoscienceWorld,
    /// URL points straight at a document file; bypasses all routing.
    DirectFile,
    /// Catch-all for unrecognized domains.
    Generic,
}

/// Domain suffix → publisher table. First match wins; order is not
/// significant because the suffixes are disjoint.
const DOMAIN_TABLE: [(&str, Publisher); 11] = [
    ("sciencedirect.com", Publisher::ScienceDirect),
    ("mdpi.com", Publisher::Mdpi),
    ("heinonline.org", Publisher::HeinOnline),
    ("onlinelibrary.wiley.com", Publisher::Wiley),
    ("tandfonline.com", Publisher::TandfOnline),
    ("link.springer.com", Publisher::Springer),
    ("brill.com", Publisher::Brill),
    ("ieee.org", Publisher::Ieee),
    ("researchgate.net", Publisher::ResearchGate),
    ("iopscience.iop.org", Publisher::Iop),
    ("geoscienceworld.org", Publisher::GeoscienceWorld),
];

impl Publisher {
    /// Publishers that own a durable download queue, in a stable order.
    pub const QUEUEABLE: [Publisher; 11] = [
        Publisher::ScienceDirect,
        Publisher::Mdpi,
        Publisher::HeinOnline,
        Publisher::Wiley,
        Publisher::TandfOnline,
        Publisher::Springer,
        Publisher::Brill,
        Publisher::Ieee,
        Publisher::ResearchGate,
        Publisher::Iop,
        Publisher::GeoscienceWorld,
    ];

    /// Stable lowercase identifier used in queue file names and CLI flags.
    #[must_use]
    pub fn slug(self) -> &'static str {
        match self {
            Publisher::ScienceDirect => "sciencedirect",
            Publisher::Mdpi => "mdpi",
            Publisher::HeinOnline => "heinonline",
            Publisher::Wiley => "wiley",
            Publisher::TandfOnline => "tandfonline",
            Publisher::Springer => "springer",
            Publisher::Brill => "brill",
            Publisher::Ieee => "ieee",
            Publisher::ResearchGate => "researchgate",
            Publisher::Iop => "iop",
            Publisher::GeoscienceWorld => "geoscienceworld",
            Publisher::DirectFile => "direct",
            Publisher::Generic => "generic",
        }
    }

    /// Reverse of [`slug`](Self::slug) for the concrete publishers.
    #[must_use]
    pub fn from_slug(slug: &str) -> Option<Publisher> {
        Publisher::QUEUEABLE
            .iter()
            .copied()
            .find(|p| p.slug() == slug)
    }

    /// Name of this publisher's durable queue file.
    #[must_use]
    pub fn queue_file_name(self) -> String {
        format!("{}_urls.csv", self.slug())
    }

    /// Whether links for this identity are held in a durable queue
    /// (the routing pseudo-identities are handled inline instead).
    #[must_use]
    pub fn is_queueable(self) -> bool {
        !matches!(self, Publisher::DirectFile | Publisher::Generic)
    }
}

impl fmt::Display for Publisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Publisher::ScienceDirect => "ScienceDirect",
            Publisher::Mdpi => "MDPI",
            Publisher::HeinOnline => "HeinOnline",
            Publisher::Wiley => "Wiley",
            Publisher::TandfOnline => "Taylor & Francis",
            Publisher::Springer => "Springer",
            Publisher::Brill => "Brill",
            Publisher::Ieee => "IEEE",
            Publisher::ResearchGate => "ResearchGate",
            Publisher::Iop => "IOP Science",
            Publisher::GeoscienceWorld => "GeoScienceWorld",
            Publisher::DirectFile => "direct file",
            Publisher::Generic => "generic",
        };
        f.write_str(name)
    }
}

/// Classifies a URL into exactly one publisher identity.
///
/// Total over all inputs: unparseable URLs classify as [`Publisher::Generic`].
#[must_use]
pub fn classify(url: &str) -> Publisher {
    let trimmed = url.trim();
    if trimmed.to_ascii_lowercase().ends_with(".pdf") {
        return Publisher::DirectFile;
    }

    let Some(host) = Url::parse(trimmed)
        .ok()
        .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
    else {
        return Publisher::Generic;
    };

    for (domain, publisher) in DOMAIN_TABLE {
        if host == domain || host.ends_with(&format!(".{domain}")) {
            return publisher;
        }
    }

    Publisher::Generic
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== DirectFile Tests ====================

    #[test]
    fn test_classify_pdf_suffix_is_direct_file() {
        assert_eq!(
            classify("https://example.com/papers/wreck-survey.pdf"),
            Publisher::DirectFile
        );
    }

    #[test]
    fn test_classify_pdf_suffix_wins_over_known_domain() {
        assert_eq!(
            classify("https://www.mdpi.com/2077-1312/11/2/369.pdf"),
            Publisher::DirectFile
        );
        assert_eq!(
            classify("https://www.sciencedirect.com/science/article/pii/S1.pdf"),
            Publisher::DirectFile
        );
    }

    #[test]
    fn test_classify_pdf_suffix_case_insensitive() {
        assert_eq!(
            classify("https://example.com/REPORT.PDF"),
            Publisher::DirectFile
        );
    }

    // ==================== Publisher Domain Tests ====================

    #[test]
    fn test_classify_known_publisher_domains() {
        let cases = [
            (
                "https://www.sciencedirect.com/science/article/pii/S0025326X19300123",
                Publisher::ScienceDirect,
            ),
            ("https://www.mdpi.com/2077-1312/11/2/369", Publisher::Mdpi),
            (
                "https://heinonline.org/HOL/LandingPage?handle=hein.journals/xyz",
                Publisher::HeinOnline,
            ),
            (
                "https://onlinelibrary.wiley.com/doi/10.1002/example",
                Publisher::Wiley,
            ),
            (
                "https://www.tandfonline.com/doi/full/10.1080/example",
                Publisher::TandfOnline,
            ),
            (
                "https://link.springer.com/article/10.1007/example",
                Publisher::Springer,
            ),
            ("https://brill.com/view/journals/example", Publisher::Brill),
            (
                "https://ieeexplore.ieee.org/document/123456",
                Publisher::Ieee,
            ),
            (
                "https://www.researchgate.net/publication/123456",
                Publisher::ResearchGate,
            ),
            (
                "https://iopscience.iop.org/article/10.1088/example",
                Publisher::Iop,
            ),
            (
                "https://pubs.geoscienceworld.org/books/example",
                Publisher::GeoscienceWorld,
            ),
        ];
        for (url, expected) in cases {
            assert_eq!(classify(url), expected, "url: {url}");
        }
    }

    #[test]
    fn test_classify_subdomain_matches() {
        assert_eq!(
            classify("https://pdf.sciencedirectassets.com/file"),
            Publisher::Generic,
            "assets CDN is a different registrable domain"
        );
        assert_eq!(
            classify("https://www.mdpi.com/journal/jmse"),
            Publisher::Mdpi
        );
    }

    #[test]
    fn test_classify_domain_must_be_suffix_not_substring() {
        // A hostile or unrelated host embedding a publisher name must not match.
        assert_eq!(
            classify("https://mdpi.com.evil.example/paper"),
            Publisher::Generic
        );
        assert_eq!(
            classify("https://notmdpi.com/paper"),
            Publisher::Generic
        );
    }

    // ==================== Generic Tests ====================

    #[test]
    fn test_classify_unknown_domain_is_generic() {
        assert_eq!(
            classify("https://journals.example.edu/article/42"),
            Publisher::Generic
        );
    }

    #[test]
    fn test_classify_unparseable_url_is_generic() {
        assert_eq!(classify("not a url at all"), Publisher::Generic);
        assert_eq!(classify(""), Publisher::Generic);
    }

    // ==================== Slug / Queue Naming Tests ====================

    #[test]
    fn test_slug_round_trips_for_queueable_publishers() {
        for publisher in Publisher::QUEUEABLE {
            assert_eq!(Publisher::from_slug(publisher.slug()), Some(publisher));
        }
    }

    #[test]
    fn test_from_slug_rejects_pseudo_identities() {
        assert_eq!(Publisher::from_slug("direct"), None);
        assert_eq!(Publisher::from_slug("generic"), None);
        assert_eq!(Publisher::from_slug("unknown"), None);
    }

    #[test]
    fn test_queue_file_name_format() {
        assert_eq!(
            Publisher::ScienceDirect.queue_file_name(),
            "sciencedirect_urls.csv"
        );
        assert_eq!(Publisher::Wiley.queue_file_name(), "wiley_urls.csv");
    }

    #[test]
    fn test_is_queueable_excludes_pseudo_identities() {
        assert!(Publisher::Mdpi.is_queueable());
        assert!(!Publisher::DirectFile.is_queueable());
        assert!(!Publisher::Generic.is_queueable());
    }
}
