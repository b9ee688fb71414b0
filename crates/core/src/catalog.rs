//! The static mocktail menu.
//!
//! The catalog is read-only and built into the binary. Cart lines copy their
//! display fields from here when a product is first added.

use core::cmp::Ordering;
use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::{Price, ProductId};

/// Menu section a mocktail is listed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Classic,
    Signature,
    Seasonal,
    Premium,
}

impl Category {
    /// Every category in menu order.
    pub const ALL: [Self; 4] = [
        Self::Classic,
        Self::Signature,
        Self::Seasonal,
        Self::Premium,
    ];

    /// The lowercase form used in query strings.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Classic => "classic",
            Self::Signature => "signature",
            Self::Seasonal => "seasonal",
            Self::Premium => "premium",
        }
    }

    /// Capitalized label for display.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Classic => "Classic",
            Self::Signature => "Signature",
            Self::Seasonal => "Seasonal",
            Self::Premium => "Premium",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("invalid category: {s}"))
    }
}

/// Menu ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortKey {
    /// Alphabetical by name.
    #[default]
    Name,
    PriceLow,
    PriceHigh,
    Calories,
    PreparationTime,
}

impl SortKey {
    /// Every sort key in the order the menu offers them.
    pub const ALL: [Self; 5] = [
        Self::Name,
        Self::PriceLow,
        Self::PriceHigh,
        Self::Calories,
        Self::PreparationTime,
    ];

    /// The query-string form.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::PriceLow => "price-low",
            Self::PriceHigh => "price-high",
            Self::Calories => "calories",
            Self::PreparationTime => "preparationTime",
        }
    }

    /// Label for the sort dropdown.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Name => "Name",
            Self::PriceLow => "Price: Low to High",
            Self::PriceHigh => "Price: High to Low",
            Self::Calories => "Calories",
            Self::PreparationTime => "Preparation Time",
        }
    }

    fn compare(self, a: &Mocktail, b: &Mocktail) -> Ordering {
        match self {
            Self::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            Self::PriceLow => a.price.cmp(&b.price),
            Self::PriceHigh => b.price.cmp(&a.price),
            Self::Calories => a.calories.cmp(&b.calories),
            Self::PreparationTime => a.preparation_time.cmp(&b.preparation_time),
        }
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("invalid sort key: {s}"))
    }
}

/// A product on the menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mocktail {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Price,
    pub image: String,
    pub category: Category,
    pub ingredients: Vec<String>,
    /// Minutes.
    pub preparation_time: u32,
    pub calories: u32,
    pub tags: Vec<String>,
    pub is_best_seller: bool,
    pub is_new: bool,
}

impl Mocktail {
    fn matches(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(needle)
            || self.description.to_lowercase().contains(needle)
            || self.tags.iter().any(|t| t.to_lowercase().contains(needle))
    }
}

/// Filter and ordering for a menu listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MenuQuery {
    /// Case-insensitive substring over name, description and tags.
    pub search: Option<String>,
    /// `None` lists every category.
    pub category: Option<Category>,
    pub sort: SortKey,
}

/// The full menu.
#[derive(Debug, Clone)]
pub struct Catalog {
    items: Vec<Mocktail>,
}

impl Catalog {
    /// The built-in 25-item menu.
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            items: MENU.iter().map(MenuEntry::to_mocktail).collect(),
        }
    }

    /// A catalog over an explicit list.
    #[must_use]
    pub const fn from_items(items: Vec<Mocktail>) -> Self {
        Self { items }
    }

    /// All items in catalog order.
    #[must_use]
    pub fn all(&self) -> &[Mocktail] {
        &self.items
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Look up a product by id.
    #[must_use]
    pub fn get(&self, id: &ProductId) -> Option<&Mocktail> {
        self.items.iter().find(|m| &m.id == id)
    }

    /// Filter and sort the menu.
    ///
    /// A blank search term matches everything. Ties keep catalog order.
    #[must_use]
    pub fn search(&self, query: &MenuQuery) -> Vec<&Mocktail> {
        let needle = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);

        let mut found: Vec<&Mocktail> = self
            .items
            .iter()
            .filter(|m| needle.as_deref().is_none_or(|n| m.matches(n)))
            .filter(|m| query.category.is_none_or(|c| m.category == c))
            .collect();

        found.sort_by(|a, b| query.sort.compare(a, b));
        found
    }

    /// Items flagged as best sellers, in catalog order.
    pub fn best_sellers(&self) -> impl Iterator<Item = &Mocktail> {
        self.items.iter().filter(|m| m.is_best_seller)
    }

    /// Items flagged as new, in catalog order.
    pub fn new_arrivals(&self) -> impl Iterator<Item = &Mocktail> {
        self.items.iter().filter(|m| m.is_new)
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

struct MenuEntry {
    id: &'static str,
    name: &'static str,
    description: &'static str,
    cents: i64,
    image: &'static str,
    category: Category,
    ingredients: [&'static str; 5],
    preparation_time: u32,
    calories: u32,
    tags: [&'static str; 3],
    best_seller: bool,
    new: bool,
}

impl MenuEntry {
    fn to_mocktail(&self) -> Mocktail {
        Mocktail {
            id: ProductId::new(self.id),
            name: self.name.to_owned(),
            description: self.description.to_owned(),
            price: Price::from_cents(self.cents),
            image: self.image.to_owned(),
            category: self.category,
            ingredients: self.ingredients.iter().map(|s| (*s).to_owned()).collect(),
            preparation_time: self.preparation_time,
            calories: self.calories,
            tags: self.tags.iter().map(|s| (*s).to_owned()).collect(),
            is_best_seller: self.best_seller,
            is_new: self.new,
        }
    }
}

const PLACEHOLDER: &str = "/static/images/placeholder.svg";

const MENU: &[MenuEntry] = &[
    MenuEntry {
        id: "1",
        name: "Sunset Bliss",
        description: "A tropical blend of pineapple, coconut, and passion fruit with a hint of lime",
        cents: 1299,
        image: "https://heybairtender.s3.amazonaws.com/recipes/sunset-bliss5823.png",
        category: Category::Signature,
        ingredients: ["Pineapple Juice", "Coconut Cream", "Passion Fruit", "Fresh Lime", "Agave Syrup"],
        preparation_time: 5,
        calories: 180,
        tags: ["Tropical", "Creamy", "Sweet"],
        best_seller: true,
        new: false,
    },
    MenuEntry {
        id: "2",
        name: "Berry Mojito",
        description: "Fresh berries muddled with mint and lime, topped with sparkling water",
        cents: 1099,
        image: PLACEHOLDER,
        category: Category::Classic,
        ingredients: ["Mixed Berries", "Fresh Mint", "Lime", "Simple Syrup", "Sparkling Water"],
        preparation_time: 7,
        calories: 120,
        tags: ["Refreshing", "Fruity", "Sparkling"],
        best_seller: false,
        new: true,
    },
    MenuEntry {
        id: "3",
        name: "Cucumber Cooler",
        description: "Crisp cucumber and mint infused with elderflower and citrus notes",
        cents: 1199,
        image: PLACEHOLDER,
        category: Category::Signature,
        ingredients: ["Fresh Cucumber", "Mint", "Elderflower Cordial", "Lime", "Soda Water"],
        preparation_time: 6,
        calories: 90,
        tags: ["Refreshing", "Light", "Herbal"],
        best_seller: false,
        new: false,
    },
    MenuEntry {
        id: "4",
        name: "Spiced Apple Fizz",
        description: "Warm apple cider spices meet crisp sparkling apple cider",
        cents: 1399,
        image: PLACEHOLDER,
        category: Category::Seasonal,
        ingredients: ["Apple Cider", "Cinnamon", "Star Anise", "Orange", "Ginger Beer"],
        preparation_time: 8,
        calories: 150,
        tags: ["Spiced", "Warm", "Seasonal"],
        best_seller: true,
        new: false,
    },
    MenuEntry {
        id: "5",
        name: "Tropical Sunrise",
        description: "Vibrant layers of orange, pineapple, and grenadine create a stunning visual",
        cents: 1199,
        image: PLACEHOLDER,
        category: Category::Signature,
        ingredients: ["Orange Juice", "Pineapple Juice", "Grenadine", "Lime", "Ice"],
        preparation_time: 4,
        calories: 140,
        tags: ["Colorful", "Sweet", "Tropical"],
        best_seller: false,
        new: false,
    },
    MenuEntry {
        id: "6",
        name: "Midnight Berry",
        description: "Deep berry flavors with acai and blueberry, finished with lavender",
        cents: 1499,
        image: PLACEHOLDER,
        category: Category::Premium,
        ingredients: ["Acai Berry", "Blueberry", "Blackberry", "Lavender Syrup", "Lemon"],
        preparation_time: 7,
        calories: 160,
        tags: ["Antioxidant", "Rich", "Floral"],
        best_seller: false,
        new: true,
    },
    MenuEntry {
        id: "7",
        name: "Mango Tango",
        description: "Sweet mango puree with tangy lime and spicy ginger",
        cents: 1199,
        image: PLACEHOLDER,
        category: Category::Signature,
        ingredients: ["Mango Puree", "Fresh Lime", "Ginger Syrup", "Soda Water", "Mint"],
        preparation_time: 5,
        calories: 160,
        tags: ["Tropical", "Spicy", "Sweet"],
        best_seller: true,
        new: false,
    },
    MenuEntry {
        id: "8",
        name: "Citrus Splash",
        description: "A refreshing blend of orange, grapefruit, and lemon with a hint of rosemary",
        cents: 1099,
        image: PLACEHOLDER,
        category: Category::Classic,
        ingredients: ["Orange Juice", "Grapefruit Juice", "Lemon", "Rosemary", "Sparkling Water"],
        preparation_time: 4,
        calories: 110,
        tags: ["Citrus", "Refreshing", "Herbal"],
        best_seller: false,
        new: false,
    },
    MenuEntry {
        id: "9",
        name: "Pomegranate Sparkler",
        description: "Antioxidant-rich pomegranate with lime and mint",
        cents: 1399,
        image: PLACEHOLDER,
        category: Category::Premium,
        ingredients: ["Pomegranate Juice", "Lime", "Mint", "Simple Syrup", "Soda Water"],
        preparation_time: 6,
        calories: 130,
        tags: ["Antioxidant", "Tart", "Refreshing"],
        best_seller: false,
        new: true,
    },
    MenuEntry {
        id: "10",
        name: "Vanilla Berry",
        description: "Mixed berries infused with vanilla and lime",
        cents: 1299,
        image: PLACEHOLDER,
        category: Category::Signature,
        ingredients: ["Mixed Berries", "Vanilla Syrup", "Lime", "Sparkling Water", "Ice"],
        preparation_time: 5,
        calories: 140,
        tags: ["Sweet", "Creamy", "Fruity"],
        best_seller: false,
        new: false,
    },
    MenuEntry {
        id: "11",
        name: "Green Detox",
        description: "Kale, spinach, apple, and lemon for a healthy boost",
        cents: 1499,
        image: PLACEHOLDER,
        category: Category::Premium,
        ingredients: ["Kale", "Spinach", "Apple", "Lemon", "Ginger"],
        preparation_time: 7,
        calories: 80,
        tags: ["Healthy", "Green", "Detox"],
        best_seller: false,
        new: false,
    },
    MenuEntry {
        id: "12",
        name: "Watermelon Wave",
        description: "Fresh watermelon with mint and lime",
        cents: 1099,
        image: PLACEHOLDER,
        category: Category::Seasonal,
        ingredients: ["Fresh Watermelon", "Mint", "Lime", "Simple Syrup", "Ice"],
        preparation_time: 6,
        calories: 120,
        tags: ["Refreshing", "Summer", "Light"],
        best_seller: false,
        new: false,
    },
    MenuEntry {
        id: "13",
        name: "Coconut Dream",
        description: "Creamy coconut with pineapple and vanilla",
        cents: 1399,
        image: PLACEHOLDER,
        category: Category::Signature,
        ingredients: ["Coconut Cream", "Pineapple Juice", "Vanilla", "Ice", "Lime"],
        preparation_time: 5,
        calories: 190,
        tags: ["Creamy", "Tropical", "Sweet"],
        best_seller: false,
        new: false,
    },
    MenuEntry {
        id: "14",
        name: "Ginger Zest",
        description: "Spicy ginger with citrus and honey",
        cents: 1199,
        image: PLACEHOLDER,
        category: Category::Classic,
        ingredients: ["Fresh Ginger", "Lemon", "Orange", "Honey", "Sparkling Water"],
        preparation_time: 6,
        calories: 100,
        tags: ["Spicy", "Warm", "Citrus"],
        best_seller: false,
        new: false,
    },
    MenuEntry {
        id: "15",
        name: "Blue Lagoon",
        description: "Blue curaçao with lemon and lime",
        cents: 1299,
        image: PLACEHOLDER,
        category: Category::Signature,
        ingredients: ["Blue Curaçao", "Lemon", "Lime", "Simple Syrup", "Soda Water"],
        preparation_time: 4,
        calories: 150,
        tags: ["Colorful", "Citrus", "Sweet"],
        best_seller: false,
        new: false,
    },
    MenuEntry {
        id: "16",
        name: "Autumn Spice",
        description: "Apple cider with autumn spices and orange",
        cents: 1399,
        image: PLACEHOLDER,
        category: Category::Seasonal,
        ingredients: ["Apple Cider", "Cinnamon", "Nutmeg", "Orange", "Cloves"],
        preparation_time: 8,
        calories: 140,
        tags: ["Spiced", "Warm", "Seasonal"],
        best_seller: false,
        new: false,
    },
    MenuEntry {
        id: "17",
        name: "Tropical Storm",
        description: "Passion fruit, mango, and orange with a spicy kick",
        cents: 1499,
        image: PLACEHOLDER,
        category: Category::Premium,
        ingredients: ["Passion Fruit", "Mango", "Orange", "Chili", "Lime"],
        preparation_time: 7,
        calories: 170,
        tags: ["Spicy", "Tropical", "Complex"],
        best_seller: false,
        new: false,
    },
    MenuEntry {
        id: "18",
        name: "Mint Julep",
        description: "Fresh mint with lime and simple syrup",
        cents: 1099,
        image: PLACEHOLDER,
        category: Category::Classic,
        ingredients: ["Fresh Mint", "Lime", "Simple Syrup", "Crushed Ice", "Soda Water"],
        preparation_time: 5,
        calories: 90,
        tags: ["Refreshing", "Minty", "Classic"],
        best_seller: false,
        new: false,
    },
    MenuEntry {
        id: "19",
        name: "Ruby Red",
        description: "Grapefruit with cranberry and lime",
        cents: 1199,
        image: PLACEHOLDER,
        category: Category::Signature,
        ingredients: ["Grapefruit Juice", "Cranberry Juice", "Lime", "Simple Syrup", "Ice"],
        preparation_time: 4,
        calories: 110,
        tags: ["Tart", "Refreshing", "Red"],
        best_seller: false,
        new: false,
    },
    MenuEntry {
        id: "20",
        name: "Honey Lemon",
        description: "Fresh lemon with honey and thyme",
        cents: 1099,
        image: PLACEHOLDER,
        category: Category::Classic,
        ingredients: ["Fresh Lemon", "Honey", "Thyme", "Sparkling Water", "Ice"],
        preparation_time: 5,
        calories: 95,
        tags: ["Sweet", "Citrus", "Herbal"],
        best_seller: false,
        new: false,
    },
    MenuEntry {
        id: "21",
        name: "Peach Paradise",
        description: "Fresh peach puree with vanilla and lemon",
        cents: 1299,
        image: PLACEHOLDER,
        category: Category::Signature,
        ingredients: ["Peach Puree", "Vanilla Syrup", "Lemon", "Sparkling Water", "Mint"],
        preparation_time: 6,
        calories: 150,
        tags: ["Sweet", "Fruity", "Creamy"],
        best_seller: false,
        new: false,
    },
    MenuEntry {
        id: "22",
        name: "Winter Berry",
        description: "Mixed winter berries with cinnamon and orange",
        cents: 1399,
        image: PLACEHOLDER,
        category: Category::Seasonal,
        ingredients: ["Winter Berries", "Cinnamon", "Orange", "Simple Syrup", "Sparkling Water"],
        preparation_time: 7,
        calories: 130,
        tags: ["Seasonal", "Spiced", "Berry"],
        best_seller: false,
        new: false,
    },
    MenuEntry {
        id: "23",
        name: "Lavender Lemonade",
        description: "Fresh lemonade with lavender syrup",
        cents: 1299,
        image: PLACEHOLDER,
        category: Category::Premium,
        ingredients: ["Fresh Lemon", "Lavender Syrup", "Sparkling Water", "Ice", "Lavender Sprig"],
        preparation_time: 5,
        calories: 120,
        tags: ["Floral", "Refreshing", "Elegant"],
        best_seller: false,
        new: false,
    },
    MenuEntry {
        id: "24",
        name: "Tropical Breeze",
        description: "Pineapple, coconut, and banana smoothie style",
        cents: 1399,
        image: PLACEHOLDER,
        category: Category::Signature,
        ingredients: ["Pineapple", "Coconut Milk", "Banana", "Honey", "Ice"],
        preparation_time: 6,
        calories: 200,
        tags: ["Creamy", "Tropical", "Smoothie"],
        best_seller: false,
        new: false,
    },
    MenuEntry {
        id: "25",
        name: "Citrus Mint",
        description: "Orange, lemon, and lime with fresh mint",
        cents: 1099,
        image: PLACEHOLDER,
        category: Category::Classic,
        ingredients: ["Orange", "Lemon", "Lime", "Fresh Mint", "Sparkling Water"],
        preparation_time: 4,
        calories: 100,
        tags: ["Citrus", "Minty", "Refreshing"],
        best_seller: false,
        new: false,
    },
];
