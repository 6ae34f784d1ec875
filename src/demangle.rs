// SPDX-License-Identifier: BSD-3-Clause
//! Symbol naming.
//!
//! The classifier needs to know whether a callee belongs to the C++ standard
//! library, which it decides from the callee's display name.

/// Display-name service for mangled symbols.
pub trait Demangler: Send + Sync {
    /// The human-readable name of `symbol`, if it is a valid mangled name.
    fn demangle(&self, symbol: &str) -> Option<String>;

    /// Whether the display name of `symbol` starts with `std::`.
    fn is_std(&self, symbol: &str) -> bool {
        self.demangle(symbol)
            .map(|n| n.starts_with("std::"))
            .unwrap_or(false)
    }
}

/// Itanium C++ ABI demangler.
///
/// The display name includes the return type where the mangling encodes
/// one (template functions), so `std::max<int>` is *not* a `std::` name:
/// it displays as `int const& std::max<int>(int const&, int const&)`.
#[derive(Clone, Copy, Debug, Default)]
pub struct CppDemangler;

impl Demangler for CppDemangler {
    fn demangle(&self, symbol: &str) -> Option<String> {
        cpp_demangle::Symbol::new(symbol)
            .ok()?
            .demangle(&cpp_demangle::DemangleOptions::default())
            .ok()
    }
}

#[cfg(test)]
mod tests {
    use super::{CppDemangler, Demangler};

    #[test]
    fn std_names() {
        let d = CppDemangler;
        assert!(d.is_std("_ZSt9terminatev"));
        assert!(d.is_std("_ZNSt6vectorIiSaIiEE9push_backERKi"));
        assert!(d.is_std("_ZNKSt6vectorIiSaIiEE4sizeEv"));
        assert!(d.is_std("_ZNSaIcEC1Ev"));
        assert!(d.is_std("_ZNSsC1EPKc"));
        assert!(d.is_std("_ZSt4endlIcSt11char_traitsIcEERSt13basic_ostreamIT_T0_ES6_"));
        // Returns a `std::` type
        assert!(d.is_std("_Z3fooIiESsv"));
    }

    #[test]
    fn non_std_names() {
        let d = CppDemangler;
        assert!(!d.is_std("malloc"));
        assert!(!d.is_std("_Z3fooPi"));
        assert!(!d.is_std("_ZN3foo3barEv"));
        assert!(!d.is_std("_Znwm"));
        assert!(!d.is_std(""));
        // Display name starts with the return type
        assert!(!d.is_std("_ZSt3maxIiERKT_S2_S2_"));
    }

    #[test]
    fn display_names() {
        let d = CppDemangler;
        assert_eq!(Some("foo(int*)".to_string()), d.demangle("_Z3fooPi"));
        assert_eq!(
            Some("std::terminate()".to_string()),
            d.demangle("_ZSt9terminatev")
        );
        assert_eq!(None, d.demangle("main"));
        // Truncated length prefix
        assert_eq!(None, d.demangle("_Z99999999999999999999999foo"));
    }

    struct Fixed;

    impl Demangler for Fixed {
        fn demangle(&self, symbol: &str) -> Option<String> {
            (symbol == "x").then(|| String::from("std::thing"))
        }
    }

    #[test]
    fn default_is_std() {
        assert!(Fixed.is_std("x"));
        assert!(!Fixed.is_std("y"));
    }
}
