//! Checked arithmetic over the integer widths the protocol uses. Every
//! accumulator mutation goes through these traits so an overflow rejects the
//! transition instead of wrapping.

use crate::error::GameError;
use solana_program::program_error::ProgramError;
use spl_math::approximations::sqrt;
use std::convert::TryFrom;

pub trait TrySub: Sized {
    fn try_sub(self, rhs: Self) -> Result<Self, ProgramError>;
    fn try_self_sub(&mut self, rhs: Self) -> Result<(), ProgramError>;
}

pub trait TryAdd: Sized {
    fn try_add(self, rhs: Self) -> Result<Self, ProgramError>;
    fn try_self_add(&mut self, rhs: Self) -> Result<(), ProgramError>;
}

pub trait TryDiv<RHS>: Sized {
    fn try_floor_div(self, rhs: RHS) -> Result<Self, ProgramError>;
}

pub trait TryMul<RHS>: Sized {
    fn try_mul(self, rhs: RHS) -> Result<Self, ProgramError>;
}

pub trait TryRem<RHS>: Sized {
    fn try_rem(self, rhs: RHS) -> Result<Self, ProgramError>;
}

pub trait TrySqrt: Sized {
    fn try_sqrt(self) -> Result<Self, ProgramError>;
}

pub trait TryCast<Into>: Sized {
    fn try_cast(self) -> Result<Into, ProgramError>;
}

macro_rules! impl_checked {
    ($ty:ty) => {
        impl TrySub for $ty {
            fn try_sub(self, rhs: Self) -> Result<Self, ProgramError> {
                self.checked_sub(rhs).ok_or(GameError::Overflow.into())
            }
            fn try_self_sub(&mut self, rhs: Self) -> Result<(), ProgramError> {
                *self = self.try_sub(rhs)?;
                Ok(())
            }
        }

        impl TryAdd for $ty {
            fn try_add(self, rhs: Self) -> Result<Self, ProgramError> {
                self.checked_add(rhs).ok_or(GameError::Overflow.into())
            }
            fn try_self_add(&mut self, rhs: Self) -> Result<(), ProgramError> {
                *self = self.try_add(rhs)?;
                Ok(())
            }
        }

        impl TryDiv<$ty> for $ty {
            fn try_floor_div(self, rhs: $ty) -> Result<Self, ProgramError> {
                self.checked_div(rhs).ok_or(GameError::Overflow.into())
            }
        }

        impl TryMul<$ty> for $ty {
            fn try_mul(self, rhs: $ty) -> Result<Self, ProgramError> {
                self.checked_mul(rhs).ok_or(GameError::Overflow.into())
            }
        }

        impl TryRem<$ty> for $ty {
            fn try_rem(self, rhs: $ty) -> Result<Self, ProgramError> {
                self.checked_rem(rhs).ok_or(GameError::Overflow.into())
            }
        }

        impl TrySqrt for $ty {
            fn try_sqrt(self) -> Result<Self, ProgramError> {
                sqrt(self).ok_or(GameError::Overflow.into())
            }
        }
    };
}

impl_checked!(u64);
impl_checked!(u128);

impl TryCast<u64> for u128 {
    fn try_cast(self) -> Result<u64, ProgramError> {
        u64::try_from(self).map_err(|_| GameError::Overflow.into())
    }
}

impl TryCast<i64> for u64 {
    fn try_cast(self) -> Result<i64, ProgramError> {
        i64::try_from(self).map_err(|_| GameError::Overflow.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_u128_to_u64() {
        let big = u64::MAX as u128;
        assert_eq!(TryCast::<u64>::try_cast(big).unwrap(), u64::MAX);

        let too_big = (u64::MAX as u128) + 1;
        assert!(TryCast::<u64>::try_cast(too_big).is_err());
    }

    #[test]
    fn test_overflow_rejected() {
        assert!(u128::MAX.try_add(1).is_err());
        assert!(0u128.try_sub(1).is_err());
        assert!(u64::MAX.try_mul(2).is_err());
        assert!(1u128.try_floor_div(0).is_err());
    }

    #[test]
    fn test_self_ops() {
        let mut x = 10u128;
        x.try_self_add(5).unwrap();
        x.try_self_sub(3).unwrap();
        assert_eq!(x, 12);
    }

    #[test]
    fn test_sqrt() {
        assert_eq!(144u128.try_sqrt().unwrap(), 12);
        assert_eq!(145u128.try_sqrt().unwrap(), 12);
    }
}
