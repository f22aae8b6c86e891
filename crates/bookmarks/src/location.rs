use std::fmt;
use std::str::FromStr;

use starproto::fly_ship::FlyShip;

/// Celestial coordinates of a planet or moon: `x:y:z:planet:satellite`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LocationKey {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub planet: i32,
    pub satellite: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocationKeyError {
    Arity(usize),
    BadInt { index: usize, token: String },
}

impl fmt::Display for LocationKeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocationKeyError::Arity(n) => {
                write!(f, "location key needs 5 ':'-separated fields, got {n}")
            }
            LocationKeyError::BadInt { index, token } => {
                write!(f, "location key field {index} is not an i32: {token:?}")
            }
        }
    }
}

impl std::error::Error for LocationKeyError {}

impl LocationKey {
    pub fn fly_ship(&self) -> FlyShip {
        FlyShip {
            x: self.x,
            y: self.y,
            z: self.z,
            planet: self.planet,
            satellite: self.satellite,
        }
    }
}

impl FromStr for LocationKey {
    type Err = LocationKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let toks = s.split(':').collect::<Vec<_>>();
        if toks.len() != 5 {
            return Err(LocationKeyError::Arity(toks.len()));
        }

        let mut v = [0i32; 5];
        for (i, tok) in toks.iter().enumerate() {
            v[i] = tok
                .trim()
                .parse()
                .map_err(|_| LocationKeyError::BadInt {
                    index: i,
                    token: tok.to_string(),
                })?;
        }

        Ok(Self {
            x: v[0],
            y: v[1],
            z: v[2],
            planet: v[3],
            satellite: v[4],
        })
    }
}

impl fmt::Display for LocationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}:{}",
            self.x, self.y, self.z, self.planet, self.satellite
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_signed_fields_in_order() {
        let k: LocationKey = "-10:20:-30:1:0".parse().unwrap();
        assert_eq!(
            k,
            LocationKey {
                x: -10,
                y: 20,
                z: -30,
                planet: 1,
                satellite: 0,
            }
        );
        assert_eq!(k.to_string(), "-10:20:-30:1:0");
    }

    #[test]
    fn tolerates_padding_but_prints_canonical() {
        let k: LocationKey = " 10: 20 :30:1:2 ".parse().unwrap();
        assert_eq!(k.to_string(), "10:20:30:1:2");
    }

    #[test]
    fn rejects_wrong_arity_and_junk() {
        assert_eq!(
            "1:2:3:4".parse::<LocationKey>(),
            Err(LocationKeyError::Arity(4))
        );
        assert_eq!(
            "1:2:3:4:5:6".parse::<LocationKey>(),
            Err(LocationKeyError::Arity(6))
        );
        assert!(matches!(
            "1:2:x:4:5".parse::<LocationKey>(),
            Err(LocationKeyError::BadInt { index: 2, .. })
        ));
        assert!("".parse::<LocationKey>().is_err());
        assert!("1:2:3:4:99999999999".parse::<LocationKey>().is_err());
    }

    #[test]
    fn fly_ship_carries_all_five_fields() {
        let k: LocationKey = "10:20:30:1:2".parse().unwrap();
        let fs = k.fly_ship();
        assert_eq!(
            (fs.x, fs.y, fs.z, fs.planet, fs.satellite),
            (10, 20, 30, 1, 2)
        );
    }
}
