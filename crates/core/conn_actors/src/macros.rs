/// Defines an enum grouping several message types into one, with a `From` conversion for each
/// variant, so a single mailbox can receive messages of more than one type.
///
/// `message_type!(Msg[Msg1,Msg2]);` expands to:
///
/// ```no_run
/// # #[derive(Debug)]
/// # struct Msg1 {}
/// # #[derive(Debug)]
/// # struct Msg2 {}
/// #[derive(Debug)]
/// enum Msg {
///     Msg1(Msg1),
///     Msg2(Msg2),
/// }
/// impl From<Msg1> for Msg {
///     fn from(m: Msg1) -> Msg {
///        Msg::Msg1(m)
///     }
/// }
/// impl From<Msg2> for Msg {
///     fn from(m: Msg2) -> Msg {
///        Msg::Msg2(m)
///     }
/// }
/// ```
#[macro_export]
macro_rules! message_type {
    ( $t:ident [ $( $x:ident ),* ] ) => {
        #[derive(Debug)]
        pub enum $t {
            $(
                $x($x),
            )*
        }
        $(
            impl From<$x> for $t {
                fn from(m: $x) -> $t {
                    $t::$x(m)
                }
            }
        )*
    };
}

/// Same as [message_type!](crate::message_type), but with an explicit list of derives applied
/// to the generated enum (for messages that also need `Clone`, `Eq`, and so on).
#[macro_export]
macro_rules! fan_in_message_type {
    ( $t:ident [ $( $x:ident ),* ] : $( $derive:ident ),* ) => {
        #[derive( $( $derive ),* )]
        pub enum $t {
            $(
                $x($x),
            )*
        }
        $(
            impl From<$x> for $t {
                fn from(m: $x) -> $t {
                    $t::$x(m)
                }
            }
        )*
    };
}
