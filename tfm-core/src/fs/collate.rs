//! src/fs/collate.rs
//! ============================================================================
//! # Path collation
//!
//! The tree store keeps directory names in the same order as they are
//! displayed. The expected order is:
//!
//! ```text
//! /
//! /bin
//! /etc
//! /etc/X11
//! /etc/rc.d
//! /etc.old/X11
//! /usr
//! ```
//!
//! i.e. the required collating sequence is
//! `end-of-string < '/' < all-other-bytes-in-encoding-order`, so that a
//! directory's descendants sort as one contiguous block immediately after it.
//! Plain byte comparison gets this wrong: it would put `/etc.old` between
//! `/etc` and `/etc/X11`.

use std::cmp::Ordering;

/// Path separator byte the collation treats specially.
pub const PATH_SEP: u8 = b'/';

/// Total order over absolute paths with the separator sorting below every
/// other byte.
#[must_use]
pub fn path_cmp(a: &str, b: &str) -> Ordering {
    let a: &[u8] = a.as_bytes();
    let b: &[u8] = b.as_bytes();

    let mut i: usize = 0;
    while i < a.len() && i < b.len() && a[i] == b[i] {
        i += 1;
    }

    match (a.get(i), b.get(i)) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(&ca), Some(&cb)) => {
            if ca == PATH_SEP {
                Ordering::Less
            } else if cb == PATH_SEP {
                Ordering::Greater
            } else {
                ca.cmp(&cb)
            }
        }
    }
}

/// Number of leading bytes shared by two paths, used by the front-coded
/// tree-cache writer.
#[must_use]
pub fn common_prefix_len(a: &str, b: &str) -> usize {
    a.as_bytes()
        .iter()
        .zip(b.as_bytes())
        .take_while(|(x, y)| x == y)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_paths_compare_equal() {
        assert_eq!(path_cmp("/etc", "/etc"), Ordering::Equal);
        assert_eq!(path_cmp("/", "/"), Ordering::Equal);
    }

    #[test]
    fn test_prefix_sorts_first() {
        assert_eq!(path_cmp("/etc", "/etc/X11"), Ordering::Less);
        assert_eq!(path_cmp("/etc/X11", "/etc"), Ordering::Greater);
    }

    #[test]
    fn test_separator_sorts_below_other_bytes() {
        // Descendants of /etc come before the sibling /etc.old.
        assert_eq!(path_cmp("/etc/X11", "/etc.old"), Ordering::Less);
        assert_eq!(path_cmp("/etc.old", "/etc/X11"), Ordering::Greater);
        // Plain byte order would invert this ('.' < '/').
        assert!("/etc.old".as_bytes() < "/etc/X11".as_bytes());
    }

    #[test]
    fn test_sibling_order_is_byte_order() {
        assert_eq!(path_cmp("/bin", "/etc"), Ordering::Less);
        assert_eq!(path_cmp("/usr", "/etc"), Ordering::Greater);
    }

    #[test]
    fn test_total_order_on_sample() {
        let mut paths = vec!["/usr", "/etc.old/X11", "/etc/rc.d", "/", "/etc/X11", "/bin", "/etc"];
        paths.sort_by(|a, b| path_cmp(a, b));
        assert_eq!(
            paths,
            vec!["/", "/bin", "/etc", "/etc/X11", "/etc/rc.d", "/etc.old/X11", "/usr"]
        );
    }

    #[test]
    fn test_common_prefix_len() {
        assert_eq!(common_prefix_len("/usr/bin", "/usr/lib"), 5);
        assert_eq!(common_prefix_len("/usr", "/usr"), 4);
        assert_eq!(common_prefix_len("/a", "/b"), 1);
        assert_eq!(common_prefix_len("", "/x"), 0);
    }
}
