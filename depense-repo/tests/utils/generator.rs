use depense_repo::depense_repo::{Category, NewDepense, PaymentMethod};
use fake::faker::lorem::en::Words;
use fake::Fake;
use rand::seq::SliceRandom;
use rand::Rng;
use rust_decimal::Decimal;

pub trait Generator<T> {
    fn gen(&mut self) -> T;
}

pub struct Predefined<T> {
    values: Vec<T>,
    current_pos: usize,
}

impl<T> Predefined<T> {
    pub fn boxed(values: Vec<T>) -> Box<Predefined<T>> {
        Box::new(Predefined {
            values,
            current_pos: 0,
        })
    }
}

impl<T: Clone> Generator<T> for Predefined<T> {
    fn gen(&mut self) -> T {
        let v = self.values[self.current_pos].clone();
        self.current_pos += 1;
        v
    }
}

pub struct RandomSample<T> {
    values: Vec<T>,
}

impl<T> RandomSample<T> {
    pub fn boxed(values: Vec<T>) -> Box<RandomSample<T>> {
        Box::new(RandomSample { values })
    }
}

impl<T: Clone> Generator<T> for RandomSample<T> {
    fn gen(&mut self) -> T {
        self.values.choose(&mut rand::thread_rng()).unwrap().clone()
    }
}

pub struct FakeTitle;

impl Generator<String> for FakeTitle {
    fn gen(&mut self) -> String {
        let words: Vec<String> = Words(1..5).fake();
        words.join(" ")
    }
}

/// Positive amounts with two decimal places, below the 10 digit limit.
pub struct FakeAmount;

impl Generator<Decimal> for FakeAmount {
    fn gen(&mut self) -> Decimal {
        Decimal::new(rand::thread_rng().gen_range(1..100_000_000), 2)
    }
}

pub struct NewDepenseGenerator {
    title_gen: Box<dyn Generator<String>>,
    amnt_gen: Box<dyn Generator<Decimal>>,
    cat_gen: Box<dyn Generator<Category>>,
    custom_cat_gen: Box<dyn Generator<Option<String>>>,
    pay_gen: Box<dyn Generator<PaymentMethod>>,
}

#[allow(dead_code)]
impl NewDepenseGenerator {
    pub fn with_titles(mut self, titles: Vec<&str>) -> NewDepenseGenerator {
        let titles = titles.into_iter().map(|t| t.to_string()).collect();
        self.title_gen = Predefined::boxed(titles);
        self
    }

    pub fn with_amounts(mut self, amounts: Vec<Decimal>) -> NewDepenseGenerator {
        self.amnt_gen = Predefined::boxed(amounts);
        self
    }

    pub fn with_custom_categories(mut self, custom_categories: Vec<&str>) -> NewDepenseGenerator {
        let count = custom_categories.len();
        let custom_categories = custom_categories
            .into_iter()
            .map(|c| Some(c.to_string()))
            .collect();
        self.cat_gen = Predefined::boxed(vec![Category::Autre; count]);
        self.custom_cat_gen = Predefined::boxed(custom_categories);
        self
    }

    pub fn generate(&mut self) -> NewDepense {
        NewDepense::new(
            self.title_gen.gen(),
            self.amnt_gen.gen(),
            self.cat_gen.gen(),
            self.custom_cat_gen.gen(),
            self.pay_gen.gen(),
            None,
        )
    }

    pub fn generate_many(&mut self, count: usize) -> Vec<NewDepense> {
        let mut vec = Vec::with_capacity(count);
        for _ in 0..count {
            vec.push(self.generate())
        }
        vec
    }
}

impl Default for NewDepenseGenerator {
    fn default() -> Self {
        let categories = Category::ALL
            .into_iter()
            .filter(|c| *c != Category::Autre)
            .collect();
        NewDepenseGenerator {
            title_gen: Box::new(FakeTitle),
            amnt_gen: Box::new(FakeAmount),
            cat_gen: RandomSample::boxed(categories),
            custom_cat_gen: RandomSample::boxed(vec![None]),
            pay_gen: RandomSample::boxed(PaymentMethod::ALL.to_vec()),
        }
    }
}
