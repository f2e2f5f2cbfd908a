macro_rules! define_key_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
        pub struct $name(pub [u8; 32]);

        impl $name {
            pub fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }
        }

        impl From<[u8; 32]> for $name {
            fn from(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl core::fmt::Debug for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), hex::encode(self.0))
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&hex::encode(self.0))
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&hex::encode(self.0))
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let text = <String as serde::Deserialize>::deserialize(deserializer)?;
                let bytes = hex::decode(&text).map_err(serde::de::Error::custom)?;
                let bytes: [u8; 32] = bytes
                    .try_into()
                    .map_err(|_| serde::de::Error::custom("expected 32 hex-encoded bytes"))?;
                Ok(Self(bytes))
            }
        }
    };
}

define_key_type!(
    /// Compressed Edwards point.
    PublicKey
);
define_key_type!(
    /// Scalar in canonical little-endian encoding.
    SecretKey
);
define_key_type!(
    /// Shared ECDH point, cofactor cleared.
    KeyDerivation
);
define_key_type!(
    /// Curve point uniquely determined by an output's ephemeral secret;
    /// its appearance on chain marks the output as spent.
    KeyImage
);
define_key_type!(
    /// Keccak-256 digest.
    Hash
);

#[derive(Clone)]
pub struct KeyPair {
    pub public_key: PublicKey,
    pub secret_key: SecretKey,
}

/// One ring member's share of a ring signature.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct Signature {
    pub c: [u8; 32],
    pub r: [u8; 32],
}

impl core::fmt::Debug for Signature {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Signature({}{})", hex::encode(self.c), hex::encode(self.r))
    }
}

impl serde::Serialize for Signature {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut bytes = [0u8; 64];
        bytes[..32].copy_from_slice(&self.c);
        bytes[32..].copy_from_slice(&self.r);
        serializer.serialize_str(&hex::encode(bytes))
    }
}

impl<'de> serde::Deserialize<'de> for Signature {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::Deserialize;
        let text = String::deserialize(deserializer)?;
        let bytes = hex::decode(&text).map_err(serde::de::Error::custom)?;
        let bytes: [u8; 64] = bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("expected 64 hex-encoded bytes"))?;
        let mut sig = Signature::default();
        sig.c.copy_from_slice(&bytes[..32]);
        sig.r.copy_from_slice(&bytes[32..]);
        Ok(sig)
    }
}
