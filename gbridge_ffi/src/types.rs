use std::fmt::{Debug, Formatter};

const FUNDAMENTAL_SHIFT: usize = 2;
const FUNDAMENTAL_MAX: usize = 255 << FUNDAMENTAL_SHIFT;

/// 外部运行时的类型标识
///
/// 派生类型的标识总大于[`TypeTag::FUNDAMENTAL_MAX`]
#[repr(transparent)]
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct TypeTag(pub usize);

macro_rules! fundamentals {
    ($($name:ident = $n:expr, $display:expr;)*) => {
        impl TypeTag {
            $(pub const $name: Self = Self::fundamental($n);)*

            pub const fn fundamental_name(self) -> Option<&'static str> {
                $(if self.0 == Self::$name.0 {
                    return Some($display);
                })*
                None
            }
        }
    };
}

fundamentals! {
    INVALID = 0, "invalid";
    NONE = 1, "void";
    INTERFACE = 2, "GInterface";
    CHAR = 3, "gchar";
    UCHAR = 4, "guchar";
    BOOLEAN = 5, "gboolean";
    INT = 6, "gint";
    UINT = 7, "guint";
    LONG = 8, "glong";
    ULONG = 9, "gulong";
    INT64 = 10, "gint64";
    UINT64 = 11, "guint64";
    ENUM = 12, "GEnum";
    FLAGS = 13, "GFlags";
    FLOAT = 14, "gfloat";
    DOUBLE = 15, "gdouble";
    STRING = 16, "gchararray";
    POINTER = 17, "gpointer";
    BOXED = 18, "GBoxed";
    PARAM = 19, "GParam";
    OBJECT = 20, "GObject";
    VARIANT = 21, "GVariant";
}

impl TypeTag {
    pub const FUNDAMENTAL_MAX: usize = FUNDAMENTAL_MAX;

    pub const fn fundamental(n: usize) -> Self {
        Self(n << FUNDAMENTAL_SHIFT)
    }

    #[inline]
    pub const fn is_fundamental(self) -> bool {
        self.0 <= FUNDAMENTAL_MAX
    }

    #[inline]
    pub const fn is_valid(self) -> bool {
        self.0 != Self::INVALID.0
    }
}

impl Debug for TypeTag {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.fundamental_name() {
            Some(name) => write!(f, "TypeTag({})", name),
            None => write!(f, "TypeTag({:#x})", self.0),
        }
    }
}
