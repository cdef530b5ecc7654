/// A memory mapped register, for instance the flash controller status (FSTAT) or DHCSR.
///
/// `T` is the access width of the register.
pub trait MemoryMappedRegister<T>: Clone + From<T> + Into<T> + Sized + std::fmt::Debug {
    /// The register's address in the target memory.
    const ADDRESS: u32;
    /// The register's name.
    const NAME: &'static str;
}

/// Defines a [`bitfield`](bitfield::bitfield) register type that is located at a fixed
/// address in target memory.
///
/// ```ignore
/// memory_mapped_bitfield_register! {
///     pub struct Fstat(u8);
///     0x4002_0000, "FTFL_FSTAT",
///     impl From;
///     pub ccif, set_ccif: 7;
/// }
/// ```
macro_rules! memory_mapped_bitfield_register {
    (
        $(#[$outer:meta])*
        pub struct $reg:ident($regty:ident);
        $addr:expr, $name:expr,
        impl From;
        $($fields:tt)*
    ) => {
        bitfield::bitfield! {
            $(#[$outer])*
            #[derive(Copy, Clone, PartialEq, Eq)]
            pub struct $reg($regty);
            impl Debug;
            $($fields)*
        }

        impl From<$regty> for $reg {
            fn from(value: $regty) -> Self {
                Self(value)
            }
        }

        impl From<$reg> for $regty {
            fn from(register: $reg) -> Self {
                register.0
            }
        }

        impl $crate::memory_mapped_registers::MemoryMappedRegister<$regty> for $reg {
            const ADDRESS: u32 = $addr;
            const NAME: &'static str = $name;
        }
    };
}

pub(crate) use memory_mapped_bitfield_register;
