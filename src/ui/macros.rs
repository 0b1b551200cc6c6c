// Status lines go to stderr so BibTeX written to stdout stays clean.

#[doc(hidden)]
#[macro_export]
macro_rules! blog_line {
    ($color:expr, $category:expr, $($arg:tt)*) => {{
        use termion::color;
        let formatted_args = format!($($arg)*);
        eprintln!("{}{:>12}{} {}",
            color::Fg($color),
            $category,
            color::Fg(color::Reset),
            formatted_args
        );
    }};
}

#[macro_export]
macro_rules! blog {
    ($category:expr, $($arg:tt)*) => {
        $crate::blog_line!(termion::color::Green, $category, $($arg)*)
    };
}

#[macro_export]
macro_rules! blog_warning {
    ($category:expr, $($arg:tt)*) => {
        $crate::blog_line!(termion::color::Yellow, $category, $($arg)*)
    };
}

#[macro_export]
macro_rules! blog_working {
    ($category:expr, $($arg:tt)*) => {
        $crate::blog_line!(termion::color::Blue, $category, $($arg)*)
    };
}

#[macro_export]
macro_rules! blog_done {
    ($category:expr, $($arg:tt)*) => {
        $crate::blog_line!(termion::color::Green, $category, $($arg)*)
    };
}

pub use blog;
pub use blog_done;
pub use blog_warning;
pub use blog_working;
