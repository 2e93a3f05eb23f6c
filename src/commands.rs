mod annotate;

pub use self::annotate::annotate;
